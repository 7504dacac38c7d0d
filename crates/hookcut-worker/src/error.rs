//! Worker error types.

use thiserror::Error;

use hookcut_models::ProjectId;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Project {0} has no source video")]
    MissingSource(ProjectId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Journal entry for step '{step}' is unreadable: {message}")]
    Journal { step: String, message: String },

    #[error("Firestore error: {0}")]
    Firestore(#[from] hookcut_firestore::FirestoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] hookcut_queue::QueueError),

    #[error("Remote service error: {0}")]
    Remote(#[from] hookcut_remote::RemoteError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether another attempt of the same run could succeed.
    ///
    /// Missing records and malformed state are permanent; infrastructure
    /// hiccups and remote 5xx/429 responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Firestore(e) => e.is_retryable(),
            WorkerError::Queue(e) => e.is_retryable(),
            WorkerError::Remote(e) => e.is_retryable(),
            _ => false,
        }
    }
}
