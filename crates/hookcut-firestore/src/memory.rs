//! In-process [`ProjectStore`] for tests and local development.
//!
//! Every operation runs under a single write lock, which gives the clip
//! creation step the same all-or-nothing behavior as a Firestore transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use hookcut_models::{
    user::clip_cost, Clip, ClipId, ClipRenderStatus, Project, ProjectId, ProjectStatus, User,
    UserId,
};

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{
    apply_edit, apply_project_status, apply_render_status, sort_clips, ClipCreation, ClipEdit,
    ProjectStore,
};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    clips: HashMap<ClipId, Clip>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id.clone(), user);
    }

    /// Insert or replace a clip record.
    pub async fn insert_clip(&self, clip: Clip) {
        self.state.write().await.clips.insert(clip.id.clone(), clip);
    }

    /// Every stored project, in no particular order.
    pub async fn projects(&self) -> Vec<Project> {
        self.state.read().await.projects.values().cloned().collect()
    }

    pub async fn clip_count(&self, project_id: &ProjectId) -> usize {
        self.state
            .read()
            .await
            .clips
            .values()
            .filter(|c| &c.project_id == project_id)
            .count()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get_user(&self, user_id: &UserId) -> FirestoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn create_project(&self, project: &Project) -> FirestoreResult<()> {
        let mut state = self.state.write().await;
        if state.projects.contains_key(&project.id) {
            return Err(FirestoreError::AlreadyExists(format!("projects/{}", project.id)));
        }
        state.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn get_project(&self, project_id: &ProjectId) -> FirestoreResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(project_id).cloned())
    }

    async fn update_project_status(
        &self,
        project_id: &ProjectId,
        status: ProjectStatus,
        failure_reason: Option<&str>,
    ) -> FirestoreResult<Project> {
        let mut state = self.state.write().await;
        let project = state
            .projects
            .get_mut(project_id)
            .ok_or_else(|| FirestoreError::not_found(format!("projects/{}", project_id)))?;
        apply_project_status(project, status, failure_reason);
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: &ProjectId) -> FirestoreResult<()> {
        let mut state = self.state.write().await;
        state.clips.retain(|_, c| &c.project_id != project_id);
        state.projects.remove(project_id);
        Ok(())
    }

    async fn list_clips(&self, project_id: &ProjectId) -> FirestoreResult<Vec<Clip>> {
        let mut clips: Vec<Clip> = self
            .state
            .read()
            .await
            .clips
            .values()
            .filter(|c| &c.project_id == project_id)
            .cloned()
            .collect();
        sort_clips(&mut clips);
        Ok(clips)
    }

    async fn get_clip(&self, clip_id: &ClipId) -> FirestoreResult<Option<Clip>> {
        Ok(self.state.read().await.clips.get(clip_id).cloned())
    }

    async fn create_clips_for_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        clips: Vec<Clip>,
    ) -> FirestoreResult<ClipCreation> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let project = state
            .projects
            .get_mut(project_id)
            .filter(|p| &p.user_id == user_id)
            .ok_or_else(|| FirestoreError::not_found(format!("projects/{}", project_id)))?;

        let existing = state
            .clips
            .values()
            .filter(|c| &c.project_id == project_id)
            .count();
        if existing > 0 {
            apply_project_status(project, ProjectStatus::Processed, None);
            return Ok(ClipCreation::AlreadyPresent { clips: existing });
        }

        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| FirestoreError::not_found(format!("users/{}", user_id)))?;
        let before = user.credits;
        user.credits = before.saturating_sub(clip_cost(clips.len()));

        apply_project_status(project, ProjectStatus::Processed, None);
        let created = clips.len();
        for clip in clips {
            state.clips.insert(clip.id.clone(), clip);
        }

        Ok(ClipCreation::Created {
            clips: created,
            credits_debited: before - user.credits,
        })
    }

    async fn save_clip_edit(
        &self,
        user_id: &UserId,
        clip_id: &ClipId,
        edit: ClipEdit,
        expected_version: Option<u64>,
    ) -> FirestoreResult<Clip> {
        let mut state = self.state.write().await;
        let clip = state
            .clips
            .get_mut(clip_id)
            .filter(|c| &c.user_id == user_id)
            .ok_or_else(|| FirestoreError::not_found(format!("clips/{}", clip_id)))?;
        apply_edit(clip, edit, expected_version)?;
        Ok(clip.clone())
    }

    async fn set_clip_render_status(
        &self,
        clip_id: &ClipId,
        status: ClipRenderStatus,
        rendered_url: Option<String>,
    ) -> FirestoreResult<Clip> {
        let mut state = self.state.write().await;
        let clip = state
            .clips
            .get_mut(clip_id)
            .ok_or_else(|| FirestoreError::not_found(format!("clips/{}", clip_id)))?;
        apply_render_status(clip, status, rendered_url);
        Ok(clip.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookcut_models::{CaptionStyle, IncomingClip, ProjectSource, TranscriptWord};

    fn user(credits: u32) -> User {
        User {
            id: UserId::from("u1"),
            email: "host@example.com".into(),
            name: Some("Host".into()),
            credits,
        }
    }

    async fn seeded(credits: u32) -> (MemoryStore, Project) {
        let store = MemoryStore::new();
        store.insert_user(user(credits)).await;
        let project = Project::new(
            UserId::from("u1"),
            ProjectSource::UploadedFile,
            Some("uploads/u1/ep.mp4".into()),
            None,
            3,
            CaptionStyle::Highlight,
        );
        store.create_project(&project).await.unwrap();
        (store, project)
    }

    fn delivered(project: &Project, n: usize) -> Vec<Clip> {
        (0..n)
            .map(|i| {
                let incoming = IncomingClip {
                    raw_clip_url: format!("https://cdn.example.com/clips/{i}.mp4"),
                    transcript_segments: vec![TranscriptWord::new("hi", 0.0, 0.5)],
                    hook: format!("Hook {i}"),
                    start: (i * 30) as f64,
                    end: (i * 30 + 25) as f64,
                };
                Clip::from_incoming(&project.id, &project.user_id, &incoming)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_clip_creation_is_idempotent() {
        let (store, project) = seeded(10).await;

        let first = store
            .create_clips_for_project(&project.user_id, &project.id, delivered(&project, 3))
            .await
            .unwrap();
        assert_eq!(first, ClipCreation::Created { clips: 3, credits_debited: 6 });

        let second = store
            .create_clips_for_project(&project.user_id, &project.id, delivered(&project, 3))
            .await
            .unwrap();
        assert_eq!(second, ClipCreation::AlreadyPresent { clips: 3 });

        assert_eq!(store.clip_count(&project.id).await, 3);
        let u = store.get_user(&project.user_id).await.unwrap().unwrap();
        assert_eq!(u.credits, 4);
        let p = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(p.status, ProjectStatus::Processed);
    }

    #[tokio::test]
    async fn test_debit_saturates_at_zero() {
        let (store, project) = seeded(3).await;
        let outcome = store
            .create_clips_for_project(&project.user_id, &project.id, delivered(&project, 2))
            .await
            .unwrap();
        assert_eq!(outcome, ClipCreation::Created { clips: 2, credits_debited: 3 });
        assert_eq!(store.get_user(&project.user_id).await.unwrap().unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_clip_creation_rejects_foreign_owner() {
        let (store, project) = seeded(10).await;
        let err = store
            .create_clips_for_project(&UserId::from("intruder"), &project.id, delivered(&project, 1))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.clip_count(&project.id).await, 0);
    }

    #[tokio::test]
    async fn test_ownership_scoped_reads() {
        let (store, project) = seeded(10).await;
        let other = UserId::from("u2");
        assert!(store.get_project_for_user(&other, &project.id).await.unwrap().is_none());
        assert!(store
            .get_project_for_user(&project.user_id, &project.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_save_edit_and_render_status() {
        let (store, project) = seeded(10).await;
        let clip = delivered(&project, 1).remove(0);
        store.insert_clip(clip.clone()).await;

        let edit = ClipEdit {
            transcript: clip.transcript.clone(),
            hook: "Edited".into(),
            hook_style: None,
            captions_style: None,
            caption_style_id: Some(CaptionStyle::Karaoke),
        };
        let saved = store
            .save_clip_edit(&project.user_id, &clip.id, edit.clone(), Some(0))
            .await
            .unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.status, ClipRenderStatus::Processing);

        let stale = store
            .save_clip_edit(&project.user_id, &clip.id, edit.clone(), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(stale, FirestoreError::VersionMismatch { .. }));

        let foreign = store
            .save_clip_edit(&UserId::from("u2"), &clip.id, edit, None)
            .await
            .unwrap_err();
        assert!(foreign.is_not_found());

        let rendered = store
            .set_clip_render_status(&clip.id, ClipRenderStatus::Rendered, Some("https://cdn/out.mp4".into()))
            .await
            .unwrap();
        assert_eq!(rendered.status_view().video_url.as_deref(), Some("https://cdn/out.mp4"));
    }

    #[tokio::test]
    async fn test_delete_project_removes_clips() {
        let (store, project) = seeded(10).await;
        store
            .create_clips_for_project(&project.user_id, &project.id, delivered(&project, 2))
            .await
            .unwrap();
        store.delete_project(&project.id).await.unwrap();
        assert!(store.get_project(&project.id).await.unwrap().is_none());
        assert!(store.list_clips(&project.id).await.unwrap().is_empty());
    }
}
