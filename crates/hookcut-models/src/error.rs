//! Model-level validation errors.

use thiserror::Error;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("caption style {0} is coming soon")]
    CaptionStyleUnavailable(u8),

    #[error("unknown caption style {0}")]
    UnknownCaptionStyle(u8),

    #[error("unknown project status: {0}")]
    UnknownStatus(String),
}

impl ModelError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid { field, .. } => Some(field),
            Self::CaptionStyleUnavailable(_) | Self::UnknownCaptionStyle(_) => {
                Some("captionStyleId")
            }
            Self::UnknownStatus(_) => Some("status"),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
