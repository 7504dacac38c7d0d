//! Axum HTTP API server.
//!
//! This crate provides:
//! - Webhooks for the processing and render services
//! - Clip edit bootstrap, save-and-render and status polling
//! - Project intake (presigned uploads, creation, deletion)
//! - Session authentication, rate limiting and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;
pub mod webhook_auth;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
pub use webhook_auth::WebhookVerifier;
