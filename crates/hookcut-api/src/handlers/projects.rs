//! Project intake: upload URLs, creation, lookup and deletion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

use hookcut_models::{CaptionStyle, Clip, Project, ProjectId, ProjectSource, ProjectStatus};
use hookcut_queue::WorkflowEvent;
use hookcut_storage::keys::{is_user_upload, upload_key};
use hookcut_storage::PresignedUpload;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::metrics;
use crate::security::{is_video_content_type, validate_video_url};
use crate::state::AppState;

/// Most clips a single project may request.
pub const MAX_CLIP_COUNT: u32 = 20;
/// Reason recorded when a created project could not be handed to the workflow.
pub const START_FAILED_REASON: &str = "could not start processing";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
}

/// `POST /api/projects/upload-url`
pub async fn create_upload_url(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<UploadUrlRequest>,
) -> ApiResult<Json<PresignedUpload>> {
    if !is_video_content_type(&request.content_type) {
        return Err(ApiError::invalid_field("contentType", "only video uploads are accepted"));
    }
    let key = upload_key(&user.id, &request.filename);
    let upload = state.objects.presign_put(&key, &request.content_type).await?;
    Ok(Json(upload))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub source: ProjectSource,
    #[serde(default)]
    pub s3_key: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[validate(range(min = 1, max = 20))]
    pub clip_count: u32,
    /// Raw id so reserved styles produce a field-level error.
    #[serde(default)]
    pub caption_style: Option<u8>,
}

/// `POST /api/projects`
///
/// Creates a queued project and starts its workflow.
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let caption_style = match request.caption_style {
        Some(id) => CaptionStyle::try_from(id)?,
        None => CaptionStyle::default(),
    };

    let (s3_key, video_url) = match request.source {
        ProjectSource::UploadedFile => {
            let key = request
                .s3_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ApiError::invalid_field("s3Key", "s3Key is required for uploads"))?;
            if !is_user_upload(&user.id, &key) {
                return Err(ApiError::invalid_field("s3Key", "unknown upload key"));
            }
            (Some(key), None)
        }
        ProjectSource::VideoUrl => {
            let url = request
                .video_url
                .as_deref()
                .ok_or_else(|| ApiError::invalid_field("videoUrl", "videoUrl is required"))?;
            let url = validate_video_url(url)
                .into_result()
                .map_err(|msg| ApiError::invalid_field("videoUrl", msg))?;
            (None, Some(url))
        }
    };

    let project = Project::new(
        user.id.clone(),
        request.source,
        s3_key,
        video_url,
        request.clip_count.min(MAX_CLIP_COUNT),
        caption_style,
    );
    state.store.create_project(&project).await?;

    if let Err(e) = state
        .events
        .emit(WorkflowEvent::ProcessVideo {
            project_id: project.id.clone(),
            user_id: user.id.clone(),
        })
        .await
    {
        error!(project_id = %project.id, error = %e, "Failed to start project workflow");
        // No run owns the project, so it must not stay queued.
        if let Err(e) = state
            .store
            .update_project_status(&project.id, ProjectStatus::Failed, Some(START_FAILED_REASON))
            .await
        {
            warn!(project_id = %project.id, error = %e, "Failed to mark project failed");
        }
        return Err(e.into());
    }
    metrics::record_event_emitted("process-video");

    info!(
        project_id = %project.id,
        user_id = %user.id,
        clip_count = project.clip_count,
        "Project created"
    );
    Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    pub project: Project,
    pub clips: Vec<Clip>,
}

async fn load_owned_project(
    state: &AppState,
    user: &AuthUser,
    project_id: &ProjectId,
) -> ApiResult<Project> {
    state
        .store
        .get_project_for_user(&user.id, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

/// `GET /api/projects/:project_id`
pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<ProjectDetail>> {
    let project = load_owned_project(&state, &user, &project_id).await?;
    let clips = state.store.list_clips(&project_id).await?;
    Ok(Json(ProjectDetail { project, clips }))
}

/// `DELETE /api/projects/:project_id`
///
/// Removes stored objects first so a failure leaves the record to retry from.
pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<StatusCode> {
    let project = load_owned_project(&state, &user, &project_id).await?;

    let removed = state.objects.delete_prefix(&project.storage_prefix()).await?;
    if let Some(key) = project.s3_key.as_deref() {
        if let Err(e) = state.objects.delete_object(key).await {
            warn!(project_id = %project_id, key, error = %e, "Failed to delete source upload");
        }
    }
    state.store.delete_project(&project_id).await?;

    info!(project_id = %project_id, objects = removed, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
