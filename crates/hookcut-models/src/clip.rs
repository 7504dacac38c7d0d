//! Clip records and their render status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

use crate::project::ProjectId;
use crate::style::{CaptionStyle, TextStyle};
use crate::transcript::TranscriptWord;
use crate::user::UserId;
use crate::utils::derive_legacy_key;
use crate::webhook::IncomingClip;

string_id!(
    /// Identifier of a clip.
    ClipId
);

/// Render status of a single clip, independent of its project's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipRenderStatus {
    /// Created by the processing service, never re-rendered.
    #[default]
    Unrendered,
    Processing,
    Rendered,
    Failed,
}

impl ClipRenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipRenderStatus::Unrendered => "unrendered",
            ClipRenderStatus::Processing => "processing",
            ClipRenderStatus::Rendered => "rendered",
            ClipRenderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClipRenderStatus::Rendered | ClipRenderStatus::Failed)
    }
}

impl fmt::Display for ClipRenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A short vertical clip cut from a project's source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_clip_url: Option<String>,
    /// Legacy storage key derived from `raw_clip_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(default)]
    pub transcript: Vec<TranscriptWord>,
    #[serde(default)]
    pub hook: String,
    #[serde(default, deserialize_with = "lenient_style", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<TextStyle>")]
    pub hook_style: Option<TextStyle>,
    #[serde(default, deserialize_with = "lenient_style", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<TextStyle>")]
    pub captions_style: Option<TextStyle>,
    #[serde(default, deserialize_with = "lenient_caption_style", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<u8>")]
    pub caption_style_id: Option<CaptionStyle>,
    /// Clip start within the source video, seconds.
    pub start: f64,
    /// Clip end within the source video, seconds.
    pub end: f64,
    #[serde(default)]
    pub status: ClipRenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_url: Option<String>,
    /// Incremented on every saved edit.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clip {
    /// Build a fresh clip record from a processing-service delivery.
    pub fn from_incoming(project_id: &ProjectId, user_id: &UserId, incoming: &IncomingClip) -> Self {
        let now = Utc::now();
        Self {
            id: ClipId::new(),
            project_id: project_id.clone(),
            user_id: user_id.clone(),
            raw_clip_url: Some(incoming.raw_clip_url.clone()),
            s3_key: derive_legacy_key(&incoming.raw_clip_url),
            transcript: incoming.transcript_segments.clone(),
            hook: incoming.hook.clone(),
            hook_style: None,
            captions_style: None,
            caption_style_id: None,
            start: incoming.start,
            end: incoming.end,
            status: ClipRenderStatus::Unrendered,
            rendered_url: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// URL or key of the unedited clip video, for rendering.
    pub fn source_video(&self) -> Option<&str> {
        self.raw_clip_url.as_deref().or(self.s3_key.as_deref())
    }

    pub fn effective_hook_style(&self) -> TextStyle {
        self.hook_style.unwrap_or_else(TextStyle::default_hook)
    }

    pub fn effective_captions_style(&self) -> TextStyle {
        self.captions_style.unwrap_or_else(TextStyle::default_captions)
    }

    pub fn status_view(&self) -> ClipStatusView {
        ClipStatusView {
            status: self.status,
            video_url: match self.status {
                ClipRenderStatus::Rendered => self.rendered_url.clone(),
                _ => None,
            },
        }
    }
}

/// Body of `GET /api/clips/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipStatusView {
    pub status: ClipRenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Stored styles that no longer parse are dropped rather than failing the
/// whole record; the editor falls back to defaults.
fn lenient_style<'de, D>(deserializer: D) -> Result<Option<TextStyle>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => match TextStyle::from_json(&value) {
            Ok(style) => Some(style),
            Err(e) => {
                warn!(error = %e, "Dropping malformed stored text style");
                None
            }
        },
    })
}

fn lenient_caption_style<'de, D>(deserializer: D) -> Result<Option<CaptionStyle>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw.as_ref().and_then(|v| v.as_u64()) {
        None => None,
        Some(id) => match u8::try_from(id).ok().map(CaptionStyle::try_from) {
            Some(Ok(style)) => Some(style),
            _ => {
                warn!(caption_style_id = id, "Dropping unsupported stored caption style");
                None
            }
        },
    })
}
