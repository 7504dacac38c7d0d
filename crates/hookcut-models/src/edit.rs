//! Clip edit requests and the render payload derived from them.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::clip::{Clip, ClipId, ClipRenderStatus};
use crate::error::ModelResult;
use crate::project::ProjectId;
use crate::style::{CaptionStyle, TextStyle};
use crate::transcript::TranscriptWord;
use crate::user::UserId;

/// `POST /api/clips/{id}/edit` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClipEditRequest {
    #[validate(length(max = 5000), nested)]
    pub transcript: Vec<TranscriptWord>,
    #[validate(length(max = 500))]
    pub hook: String,
    #[serde(default)]
    #[validate(nested)]
    pub hook_style: Option<TextStyle>,
    #[serde(default)]
    #[validate(nested)]
    pub captions_style: Option<TextStyle>,
    /// Raw id so reserved styles produce a field-level error.
    #[serde(default)]
    pub caption_style_id: Option<u8>,
    #[serde(default)]
    pub render: Option<RenderInputs>,
    /// Reject the save unless the stored clip is at this version.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl ClipEditRequest {
    pub fn caption_style(&self) -> ModelResult<Option<CaptionStyle>> {
        self.caption_style_id
            .map(CaptionStyle::try_from)
            .transpose()
    }
}

/// Immutable render inputs sent along with an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderInputs {
    #[serde(default)]
    pub source_video_url: Option<String>,
    #[serde(default)]
    pub original_caption_style: Option<u8>,
}

/// `GET /api/clips/{id}/edit` body: everything the editor needs to bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipEditView {
    pub clip_id: ClipId,
    pub project_id: ProjectId,
    pub transcript: Vec<TranscriptWord>,
    pub hook: String,
    pub hook_style: TextStyle,
    pub captions_style: TextStyle,
    pub caption_style_id: CaptionStyle,
    pub status: ClipRenderStatus,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_clip_url: Option<String>,
}

impl ClipEditView {
    /// View of a stored clip, falling back to the project's caption style.
    pub fn from_clip(clip: &Clip, project_style: CaptionStyle) -> Self {
        Self {
            clip_id: clip.id.clone(),
            project_id: clip.project_id.clone(),
            transcript: clip.transcript.clone(),
            hook: clip.hook.clone(),
            hook_style: clip.effective_hook_style(),
            captions_style: clip.effective_captions_style(),
            caption_style_id: clip.caption_style_id.unwrap_or(project_style),
            status: clip.status,
            version: clip.version,
            raw_clip_url: clip.source_video().map(str::to_string),
        }
    }
}

/// Everything the render service needs to produce one edited clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub clip_id: ClipId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub source_video_url: String,
    pub transcript: Vec<TranscriptWord>,
    pub hook: String,
    pub hook_style: TextStyle,
    pub captions_style: TextStyle,
    pub caption_style_id: CaptionStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_caption_style: Option<u8>,
}
