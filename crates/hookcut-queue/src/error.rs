//! Errors from the workflow event bus.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    /// No connection to Redis could be opened.
    #[error("Event bus unreachable: {0}")]
    Unavailable(String),

    /// An envelope was not appended to the event stream.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An envelope or journal entry that does not decode.
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl QueueError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }

    /// Everything but a malformed payload can succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, QueueError::Payload(_))
    }
}
