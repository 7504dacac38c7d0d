//! Inbound webhooks from the processing and render services.
//!
//! Both endpoints authenticate before reading the body and are safe under
//! at-least-once delivery.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::{error, info, warn};

use hookcut_firestore::ClipCreation;
use hookcut_models::{
    Clip, ClipId, ClipRenderStatus, IncomingClip, ProcessingWebhook, ProcessingWebhookStatus,
    ProjectId, ProjectStatus, UserId, VideoGeneratedWebhook,
};
use hookcut_queue::WorkflowEvent;

use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{parse_body, parse_json};
use crate::metrics;
use crate::state::AppState;

/// Reason recorded when the processing service reports success without clips.
pub const NO_CLIPS_REASON: &str = "processing finished without producing any clips";
/// Reason recorded when a failure webhook carries no error text.
pub const UNSPECIFIED_FAILURE_REASON: &str = "processing failed";

/// What a processing webhook delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    ClipsCreated,
    /// Clips from an earlier delivery were already stored.
    AlreadyProcessed,
    NotifiedProcessed,
    FailureRecorded,
    Ignored,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub action: WebhookAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips: Option<usize>,
}

impl WebhookAck {
    fn new(action: WebhookAction) -> Self {
        Self {
            received: true,
            action,
            clips: None,
        }
    }
}

/// `POST /webhooks/modal`
pub async fn processing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<WebhookAck>)> {
    state.processing_webhook.verify(&headers, &body)?;
    let payload: ProcessingWebhook = parse_body(&body)?;

    let user_id = UserId::from(payload.user_id.as_str());
    let project_id = ProjectId::from(payload.project_id.as_str());
    metrics::record_webhook_received("modal", &payload.status);
    info!(
        project_id = %project_id,
        user_id = %user_id,
        status = %payload.status,
        clips = payload.clips().len(),
        "Processing webhook received"
    );

    let ack = match payload.kind() {
        ProcessingWebhookStatus::ReadyForReview if payload.clips().is_empty() => {
            warn!(project_id = %project_id, "Ready for review without clips, treating as failure");
            require_owned_project(&state, &user_id, &project_id).await?;
            emit(&state, WorkflowEvent::ProjectFailed {
                project_id,
                reason: NO_CLIPS_REASON.to_string(),
            })
            .await?;
            WebhookAck::new(WebhookAction::FailureRecorded)
        }
        ProcessingWebhookStatus::ReadyForReview => {
            ingest_clips(&state, &user_id, &project_id, payload.clips()).await?
        }
        ProcessingWebhookStatus::Completed => {
            emit(&state, WorkflowEvent::ProjectProcessed {
                project_id,
                user_id,
            })
            .await?;
            WebhookAck::new(WebhookAction::NotifiedProcessed)
        }
        ProcessingWebhookStatus::Failed => {
            let reason = payload
                .error
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .unwrap_or(UNSPECIFIED_FAILURE_REASON)
                .to_string();
            require_owned_project(&state, &user_id, &project_id).await?;
            state
                .store
                .update_project_status(&project_id, ProjectStatus::Failed, Some(&reason))
                .await?;
            emit(&state, WorkflowEvent::ProjectFailed { project_id, reason }).await?;
            WebhookAck::new(WebhookAction::FailureRecorded)
        }
        ProcessingWebhookStatus::Other(status) => {
            info!(project_id = %project_id, status = %status, "Ignoring processing webhook status");
            WebhookAck::new(WebhookAction::Ignored)
        }
    };

    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// Validate every delivered clip, then store them in one transaction.
async fn ingest_clips(
    state: &AppState,
    user_id: &UserId,
    project_id: &ProjectId,
    incoming: &[IncomingClip],
) -> ApiResult<WebhookAck> {
    let mut errors = FieldErrors::new();
    for (index, clip) in incoming.iter().enumerate() {
        if let Err(e) = clip.check(index) {
            let field = e.field().unwrap_or("clips").to_string();
            errors.entry(field).or_default().push(e.to_string());
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation {
            message: "Delivered clips are invalid".to_string(),
            errors,
        });
    }

    let clips: Vec<Clip> = incoming
        .iter()
        .map(|c| Clip::from_incoming(project_id, user_id, c))
        .collect();

    let creation = state
        .store
        .create_clips_for_project(user_id, project_id, clips)
        .await?;

    match creation {
        ClipCreation::Created {
            clips,
            credits_debited,
        } => {
            metrics::record_clips_created(clips);
            info!(
                project_id = %project_id,
                clips,
                credits_debited,
                "Clips stored"
            );
            // The clips are committed; a lost notification must not make the
            // sender redeliver.
            if let Err(e) = state
                .events
                .emit(WorkflowEvent::ProjectProcessed {
                    project_id: project_id.clone(),
                    user_id: user_id.clone(),
                })
                .await
            {
                error!(project_id = %project_id, error = %e, "Failed to emit project-processed");
            } else {
                metrics::record_event_emitted("project-processed");
            }
            Ok(WebhookAck {
                clips: Some(clips),
                ..WebhookAck::new(WebhookAction::ClipsCreated)
            })
        }
        ClipCreation::AlreadyPresent { clips } => {
            info!(project_id = %project_id, clips, "Clips already stored, skipping creation");
            Ok(WebhookAck {
                clips: Some(clips),
                ..WebhookAck::new(WebhookAction::AlreadyProcessed)
            })
        }
    }
}

async fn require_owned_project(
    state: &AppState,
    user_id: &UserId,
    project_id: &ProjectId,
) -> ApiResult<()> {
    state
        .store
        .get_project_for_user(user_id, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(())
}

async fn emit(state: &AppState, event: WorkflowEvent) -> ApiResult<()> {
    let name = event.name();
    state.events.emit(event).await?;
    metrics::record_event_emitted(name);
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderAck {
    pub clip_id: ClipId,
    pub status: ClipRenderStatus,
}

/// `POST /webhooks/video-generated`
pub async fn render_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<RenderAck>> {
    state.render_webhook.verify(&headers, &body)?;
    let payload: VideoGeneratedWebhook = parse_json(&body)?;
    if payload.clip_id.as_str().trim().is_empty() {
        return Err(ApiError::invalid_field("clipId", "clipId is required"));
    }

    let status = if payload.success {
        ClipRenderStatus::Rendered
    } else {
        ClipRenderStatus::Failed
    };
    metrics::record_webhook_received("video-generated", status.as_str());

    let video_url = payload
        .video_url
        .filter(|u| payload.success && !u.trim().is_empty());
    let clip = state
        .store
        .set_clip_render_status(&payload.clip_id, status, video_url)
        .await?;

    info!(clip_id = %clip.id, status = %clip.status, "Render result recorded");
    Ok(Json(RenderAck {
        clip_id: clip.id,
        status: clip.status,
    }))
}
