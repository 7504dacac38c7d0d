//! Editor error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditorError {
    #[error("word index {index} out of range for transcript of {len} words")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("status request failed: {0}")]
    StatusRequest(String),

    #[error("status endpoint returned HTTP {0}")]
    StatusHttp(u16),
}

impl EditorError {
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
