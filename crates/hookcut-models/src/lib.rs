//! Shared data models for hookcut.
//!
//! This crate provides Serde-serializable types for:
//! - Transcripts and on-screen text styles
//! - Projects, clips and users as persisted
//! - Webhook payloads from the processing and render services
//! - Clip edit requests and render payloads

/// Defines a transparent string identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize, schemars::JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

pub mod clip;
pub mod edit;
pub mod error;
pub mod project;
pub mod style;
pub mod transcript;
pub mod user;
pub mod utils;
pub mod webhook;

// Re-export common types
pub use clip::{Clip, ClipId, ClipRenderStatus, ClipStatusView};
pub use edit::{ClipEditRequest, ClipEditView, RenderInputs, RenderPayload};
pub use error::{ModelError, ModelResult};
pub use project::{Project, ProjectId, ProjectSource, ProjectStatus};
pub use style::{CaptionStyle, TextPosition, TextStyle, TextTarget};
pub use transcript::{normalize_transcript, strip_word_ids, TranscriptWord};
pub use user::{User, UserId, CREDITS_PER_CLIP};
pub use utils::{derive_legacy_key, validation_errors_to_map};
pub use webhook::{
    IncomingClip, ProcessingWebhook, ProcessingWebhookStatus, VideoGeneratedWebhook,
};
