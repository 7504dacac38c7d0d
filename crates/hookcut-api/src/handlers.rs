//! Request handlers.

pub mod clips;
pub mod health;
pub mod projects;
pub mod webhooks;

pub use clips::*;
pub use health::*;
pub use projects::*;
pub use webhooks::*;
