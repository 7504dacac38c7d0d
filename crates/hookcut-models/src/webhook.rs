//! Payloads delivered by the external processing and render services.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::clip::ClipId;
use crate::error::{ModelError, ModelResult};
use crate::transcript::TranscriptWord;

/// `POST /webhooks/modal` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessingWebhook {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub project_id: String,
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default)]
    pub clips: Option<Vec<IncomingClip>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Interpreted `status` of a processing webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingWebhookStatus {
    ReadyForReview,
    /// Legacy completion signal without clips.
    Completed,
    Failed,
    Other(String),
}

impl ProcessingWebhook {
    pub fn kind(&self) -> ProcessingWebhookStatus {
        match self.status.as_str() {
            "ready_for_review" => ProcessingWebhookStatus::ReadyForReview,
            "completed" => ProcessingWebhookStatus::Completed,
            "failed" => ProcessingWebhookStatus::Failed,
            other => ProcessingWebhookStatus::Other(other.to_string()),
        }
    }

    /// Clips carried by the payload, empty when absent.
    pub fn clips(&self) -> &[IncomingClip] {
        self.clips.as_deref().unwrap_or(&[])
    }
}

/// A clip reported ready by the processing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingClip {
    #[serde(default)]
    pub raw_clip_url: String,
    #[serde(default)]
    pub transcript_segments: Vec<TranscriptWord>,
    #[serde(default)]
    pub hook: String,
    pub start: f64,
    pub end: f64,
}

impl IncomingClip {
    pub fn check(&self, index: usize) -> ModelResult<()> {
        if self.raw_clip_url.trim().is_empty() {
            return Err(ModelError::invalid(
                format!("clips[{index}].raw_clip_url"),
                "clip URL is required",
            ));
        }
        if !(self.start.is_finite() && self.end.is_finite() && self.start < self.end) {
            return Err(ModelError::invalid(
                format!("clips[{index}]"),
                "start must be before end",
            ));
        }
        Ok(())
    }
}

/// `POST /webhooks/video-generated` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGeneratedWebhook {
    pub success: bool,
    pub clip_id: ClipId,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_kinds() {
        let mut hook: ProcessingWebhook = serde_json::from_value(json!({
            "user_id": "u1", "project_id": "p1", "status": "ready_for_review"
        }))
        .unwrap();
        assert_eq!(hook.kind(), ProcessingWebhookStatus::ReadyForReview);
        assert!(hook.clips().is_empty());

        hook.status = "progress".into();
        assert_eq!(hook.kind(), ProcessingWebhookStatus::Other("progress".into()));
    }

    #[test]
    fn test_missing_ids_fail_validation() {
        let hook: ProcessingWebhook = serde_json::from_value(json!({
            "user_id": "", "project_id": "p1", "status": "failed"
        }))
        .unwrap();
        assert!(hook.validate().is_err());
    }

    #[test]
    fn test_incoming_clip_check() {
        let clip = IncomingClip {
            raw_clip_url: "https://cdn.example.com/a.mp4".into(),
            transcript_segments: vec![],
            hook: String::new(),
            start: 5.0,
            end: 5.0,
        };
        assert!(clip.check(0).is_err());

        let clip = IncomingClip { end: 9.0, ..clip };
        assert!(clip.check(0).is_ok());

        let clip = IncomingClip { raw_clip_url: " ".into(), ..clip };
        assert!(clip.check(2).is_err());
    }

    #[test]
    fn test_transcript_segments_accept_text_alias() {
        let clip: IncomingClip = serde_json::from_value(json!({
            "raw_clip_url": "u", "start": 0, "end": 1,
            "transcript_segments": [{"text": "hey", "start": 0.0, "end": 0.3}]
        }))
        .unwrap();
        assert_eq!(clip.transcript_segments[0].word, "hey");
    }

    #[test]
    fn test_video_generated_shape() {
        let body: VideoGeneratedWebhook = serde_json::from_value(json!({
            "success": true, "clipId": "c1"
        }))
        .unwrap();
        assert!(body.success);
        assert_eq!(body.clip_id.as_str(), "c1");
        assert_eq!(body.video_url, None);
    }
}
