//! Clients for the services hookcut calls out to.
//!
//! Each service sits behind a trait so workflows can be tested against the
//! recording fakes in [`recording`].

pub mod error;
pub mod http;
pub mod mail;
pub mod processing;
pub mod recording;
pub mod render;

pub use error::{RemoteError, RemoteResult};
pub use http::EndpointConfig;
pub use mail::{HttpMailer, LogMailer, MailMessage, Mailer};
pub use processing::{ProcessingClient, ProcessingRequest, ProcessingService};
pub use recording::{RecordingMailer, RecordingProcessor, RecordingRenderer};
pub use render::{RenderClient, RenderService};
