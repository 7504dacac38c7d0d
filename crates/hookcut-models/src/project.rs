//! Project records: one uploaded or linked video and its processing status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::style::CaptionStyle;
use crate::user::UserId;

string_id!(
    /// Identifier of a project.
    ProjectId
);

/// Where the project's source video comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectSource {
    UploadedFile,
    VideoUrl,
}

/// Project processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Queued,
    Processing,
    Processed,
    Failed,
    /// Admission found no affordable clips. Terminal, not a failure.
    #[serde(rename = "no credits")]
    NoCredits,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Queued => "queued",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Processed => "processed",
            ProjectStatus::Failed => "failed",
            ProjectStatus::NoCredits => "no credits",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Processed | ProjectStatus::Failed | ProjectStatus::NoCredits
        )
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ProjectStatus::Queued),
            "processing" => Ok(ProjectStatus::Processing),
            "processed" => Ok(ProjectStatus::Processed),
            "failed" => Ok(ProjectStatus::Failed),
            "no credits" => Ok(ProjectStatus::NoCredits),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub source: ProjectSource,
    /// Object key of an uploaded source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    /// External URL of a linked source video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Number of clips requested at creation.
    pub clip_count: u32,
    /// Default caption style for the project's clips.
    #[serde(default)]
    pub caption_style: CaptionStyle,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// New queued project.
    pub fn new(
        user_id: UserId,
        source: ProjectSource,
        s3_key: Option<String>,
        video_url: Option<String>,
        clip_count: u32,
        caption_style: CaptionStyle,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            user_id,
            source,
            s3_key,
            video_url,
            clip_count,
            caption_style,
            status: ProjectStatus::Queued,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reference handed to the processing service: the stored key for
    /// uploads, the external URL for linked videos.
    pub fn source_ref(&self) -> Option<&str> {
        match self.source {
            ProjectSource::UploadedFile => self.s3_key.as_deref(),
            ProjectSource::VideoUrl => self.video_url.as_deref().or(self.s3_key.as_deref()),
        }
    }

    /// Prefix under which every object produced for this project lives.
    pub fn storage_prefix(&self) -> String {
        format!("projects/{}/{}/", self.user_id, self.id)
    }
}
