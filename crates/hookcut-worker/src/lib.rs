//! Durable workflow worker.
//!
//! This crate provides:
//! - Project admission and dispatch to the processing service
//! - The guardian timeout for projects whose webhook never arrives
//! - Failure recording, owner notification and clip render requests
//! - Journaled steps, per-user leases and bounded retries

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod workflow;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{RunDisposition, WorkflowEngine, WorkflowExecutor};
pub use logging::RunLogger;
pub use workflow::{
    AdmissionOutcome, FailureOutcome, GuardianOutcome, NotifyOutcome, RenderOutcome,
    WorkflowContext, WorkflowOutcome,
};
