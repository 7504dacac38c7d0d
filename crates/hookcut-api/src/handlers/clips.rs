//! Single-clip editing: bootstrap, save-and-render, status polling.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::{error, info, warn};

use hookcut_firestore::ClipEdit;
use hookcut_models::{
    strip_word_ids, CaptionStyle, Clip, ClipEditRequest, ClipEditView, ClipId, ClipRenderStatus,
    ClipStatusView, RenderPayload,
};
use hookcut_queue::WorkflowEvent;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::metrics;
use crate::security::validate_video_url;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSaveResponse {
    pub clip: ClipEditView,
    pub render_queued: bool,
}

async fn load_owned_clip(state: &AppState, user: &AuthUser, clip_id: &ClipId) -> ApiResult<Clip> {
    state
        .store
        .get_clip_for_user(&user.id, clip_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Clip not found"))
}

async fn project_caption_style(state: &AppState, clip: &Clip) -> ApiResult<CaptionStyle> {
    Ok(state
        .store
        .get_project(&clip.project_id)
        .await?
        .map(|p| p.caption_style)
        .unwrap_or_default())
}

/// `GET /api/clips/:clip_id/edit`
pub async fn get_clip_edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(clip_id): Path<ClipId>,
) -> ApiResult<Json<ClipEditView>> {
    let clip = load_owned_clip(&state, &user, &clip_id).await?;
    let style = project_caption_style(&state, &clip).await?;
    Ok(Json(ClipEditView::from_clip(&clip, style)))
}

/// `POST /api/clips/:clip_id/edit`
///
/// Persists the edit, marks the clip `processing` and queues a render.
pub async fn save_clip_edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(clip_id): Path<ClipId>,
    ValidJson(request): ValidJson<ClipEditRequest>,
) -> ApiResult<Json<ClipSaveResponse>> {
    let caption_style = request.caption_style()?;
    let clip = load_owned_clip(&state, &user, &clip_id).await?;
    let project_style = project_caption_style(&state, &clip).await?;
    let inputs = request.render.clone().unwrap_or_default();

    // The stored clip video wins over whatever the client sends.
    let source_video_url = match clip.source_video() {
        Some(source) => source.to_string(),
        None => {
            let supplied = inputs.source_video_url.as_deref().ok_or_else(|| {
                ApiError::invalid_field("render.sourceVideoUrl", "clip has no source video")
            })?;
            validate_video_url(supplied)
                .into_result()
                .map_err(|msg| ApiError::invalid_field("render.sourceVideoUrl", msg))?
        }
    };

    let edit = ClipEdit {
        transcript: strip_word_ids(&request.transcript),
        hook: request.hook.clone(),
        hook_style: request.hook_style,
        captions_style: request.captions_style,
        caption_style_id: caption_style,
    };
    let saved = state
        .store
        .save_clip_edit(&user.id, &clip_id, edit, request.expected_version)
        .await?;

    let payload = RenderPayload {
        clip_id: saved.id.clone(),
        project_id: saved.project_id.clone(),
        user_id: user.id.clone(),
        source_video_url,
        transcript: saved.transcript.clone(),
        hook: saved.hook.clone(),
        hook_style: saved.effective_hook_style(),
        captions_style: saved.effective_captions_style(),
        caption_style_id: saved.caption_style_id.unwrap_or(project_style),
        original_caption_style: inputs
            .original_caption_style
            .or(Some(project_style.id())),
    };

    if let Err(e) = state.events.emit(WorkflowEvent::GenerateVideo(payload)).await {
        error!(clip_id = %clip_id, error = %e, "Failed to queue render");
        // Leave the clip in a state the editor can re-save from.
        if let Err(e) = state
            .store
            .set_clip_render_status(&clip_id, ClipRenderStatus::Failed, None)
            .await
        {
            warn!(clip_id = %clip_id, error = %e, "Failed to mark clip failed");
        }
        return Err(e.into());
    }
    metrics::record_event_emitted("generate-video");

    info!(clip_id = %clip_id, version = saved.version, "Clip saved, render queued");
    Ok(Json(ClipSaveResponse {
        clip: ClipEditView::from_clip(&saved, project_style),
        render_queued: true,
    }))
}

/// `GET /api/clips/:clip_id/status`
pub async fn get_clip_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(clip_id): Path<ClipId>,
) -> ApiResult<Json<ClipStatusView>> {
    let clip = load_owned_clip(&state, &user, &clip_id).await?;
    Ok(Json(clip.status_view()))
}
