//! Object store errors.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A required `R2_*` variable is missing.
    #[error("R2 not configured: {0}")]
    NotConfigured(String),

    #[error("Could not presign upload for {key}: {reason}")]
    Presign { key: String, reason: String },

    #[error("Could not list objects under {prefix}: {reason}")]
    List { prefix: String, reason: String },

    #[error("Delete failed: {0}")]
    Delete(String),

    /// Empty, absolute, or containing a `..` segment.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub fn not_configured(var: &str) -> Self {
        Self::NotConfigured(format!("{} not set", var))
    }

    pub fn presign(key: &str, reason: impl ToString) -> Self {
        Self::Presign {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn list(prefix: &str, reason: impl ToString) -> Self {
        Self::List {
            prefix: prefix.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn delete(reason: impl ToString) -> Self {
        Self::Delete(reason.to_string())
    }
}
