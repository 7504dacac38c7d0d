//! Persistence seam for users, projects and clips.
//!
//! [`ProjectStore`] is implemented over Firestore for production and over
//! process memory for tests and local runs. Both share the mutation rules in
//! this module so they cannot drift apart.

use async_trait::async_trait;
use chrono::Utc;

use hookcut_models::{
    CaptionStyle, Clip, ClipId, ClipRenderStatus, Project, ProjectId, ProjectStatus, TextStyle,
    TranscriptWord, User, UserId,
};

use crate::error::{FirestoreError, FirestoreResult};

/// Edited fields persisted by a clip save. `None` styles leave the stored value alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipEdit {
    pub transcript: Vec<TranscriptWord>,
    pub hook: String,
    pub hook_style: Option<TextStyle>,
    pub captions_style: Option<TextStyle>,
    pub caption_style_id: Option<CaptionStyle>,
}

/// Outcome of [`ProjectStore::create_clips_for_project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipCreation {
    Created { clips: usize, credits_debited: u32 },
    /// Clips were already stored by an earlier delivery; nothing was inserted.
    AlreadyPresent { clips: usize },
}

impl ClipCreation {
    pub fn was_created(&self) -> bool {
        matches!(self, ClipCreation::Created { .. })
    }
}

#[async_trait]
pub trait ProjectStore: Send + Sync + 'static {
    async fn get_user(&self, user_id: &UserId) -> FirestoreResult<Option<User>>;

    async fn create_project(&self, project: &Project) -> FirestoreResult<()>;

    async fn get_project(&self, project_id: &ProjectId) -> FirestoreResult<Option<Project>>;

    /// Ownership-scoped read: another user's project is reported as missing.
    async fn get_project_for_user(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> FirestoreResult<Option<Project>> {
        Ok(self
            .get_project(project_id)
            .await?
            .filter(|p| &p.user_id == user_id))
    }

    /// Set the project status. `failure_reason` replaces the stored reason.
    async fn update_project_status(
        &self,
        project_id: &ProjectId,
        status: ProjectStatus,
        failure_reason: Option<&str>,
    ) -> FirestoreResult<Project>;

    /// Delete the project and all of its clips.
    async fn delete_project(&self, project_id: &ProjectId) -> FirestoreResult<()>;

    /// Clips of a project ordered by their position in the source video.
    async fn list_clips(&self, project_id: &ProjectId) -> FirestoreResult<Vec<Clip>>;

    async fn get_clip(&self, clip_id: &ClipId) -> FirestoreResult<Option<Clip>>;

    async fn get_clip_for_user(
        &self,
        user_id: &UserId,
        clip_id: &ClipId,
    ) -> FirestoreResult<Option<Clip>> {
        Ok(self.get_clip(clip_id).await?.filter(|c| &c.user_id == user_id))
    }

    /// Atomically insert delivered clips, mark the project processed and
    /// debit the owner's credits.
    ///
    /// Re-verifies that `user_id` owns the project. If any clip already exists
    /// for the project nothing is inserted or debited and only the status is
    /// (re)applied.
    async fn create_clips_for_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        clips: Vec<Clip>,
    ) -> FirestoreResult<ClipCreation>;

    /// Persist an edit, set the clip to `processing` and bump its version.
    async fn save_clip_edit(
        &self,
        user_id: &UserId,
        clip_id: &ClipId,
        edit: ClipEdit,
        expected_version: Option<u64>,
    ) -> FirestoreResult<Clip>;

    async fn set_clip_render_status(
        &self,
        clip_id: &ClipId,
        status: ClipRenderStatus,
        rendered_url: Option<String>,
    ) -> FirestoreResult<Clip>;
}

// =============================================================================
// Shared mutation rules
// =============================================================================

/// Apply a saved edit to a clip in place.
pub fn apply_edit(clip: &mut Clip, edit: ClipEdit, expected_version: Option<u64>) -> FirestoreResult<()> {
    if let Some(expected) = expected_version {
        if expected != clip.version {
            return Err(FirestoreError::VersionMismatch {
                expected,
                actual: clip.version,
            });
        }
    }

    clip.transcript = edit.transcript;
    clip.hook = edit.hook;
    if edit.hook_style.is_some() {
        clip.hook_style = edit.hook_style;
    }
    if edit.captions_style.is_some() {
        clip.captions_style = edit.captions_style;
    }
    if edit.caption_style_id.is_some() {
        clip.caption_style_id = edit.caption_style_id;
    }
    clip.status = ClipRenderStatus::Processing;
    clip.rendered_url = None;
    clip.version += 1;
    clip.updated_at = Utc::now();
    Ok(())
}

pub fn apply_project_status(project: &mut Project, status: ProjectStatus, failure_reason: Option<&str>) {
    project.status = status;
    project.failure_reason = failure_reason.map(str::to_string);
    project.updated_at = Utc::now();
}

pub fn apply_render_status(clip: &mut Clip, status: ClipRenderStatus, rendered_url: Option<String>) {
    clip.status = status;
    if rendered_url.is_some() {
        clip.rendered_url = rendered_url;
    }
    clip.updated_at = Utc::now();
}

/// Sort clips by start time, then creation time.
pub fn sort_clips(clips: &mut [Clip]) {
    clips.sort_by(|a, b| {
        a.start
            .total_cmp(&b.start)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
