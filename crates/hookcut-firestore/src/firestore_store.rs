//! [`ProjectStore`] over the Firestore REST API.
//!
//! Layout: top-level `users`, `projects` and `clips` collections keyed by id,
//! documents holding the camelCase JSON of the models.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{info, warn};

use hookcut_models::{
    user::clip_cost, Clip, ClipId, ClipRenderStatus, Project, ProjectId, ProjectStatus, User,
    UserId,
};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{
    apply_edit, apply_project_status, apply_render_status, sort_clips, ClipCreation, ClipEdit,
    ProjectStore,
};
use crate::types::{fields_from_model, Document, StructuredQuery, Value, Write};

pub const USERS: &str = "users";
pub const PROJECTS: &str = "projects";
pub const CLIPS: &str = "clips";

const PROJECT_STATUS_FIELDS: &[&str] = &["status", "failureReason", "updatedAt"];
const CLIP_EDIT_FIELDS: &[&str] = &[
    "transcript",
    "hook",
    "hookStyle",
    "captionsStyle",
    "captionStyleId",
    "status",
    "renderedUrl",
    "version",
    "updatedAt",
];
const CLIP_RENDER_FIELDS: &[&str] = &["status", "renderedUrl", "updatedAt"];

/// Attempts for a read-modify-write that loses an `updateTime` race.
const MAX_EDIT_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct FirestoreStore {
    client: FirestoreClient,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Ok(Self::new(FirestoreClient::from_env().await?))
    }

    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    async fn load<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        transaction: Option<&str>,
    ) -> FirestoreResult<Option<(T, Document)>> {
        match self.client.get_document(collection, id, transaction).await? {
            Some(doc) => Ok(Some((decode(&doc)?, doc))),
            None => Ok(None),
        }
    }

    fn named_doc<T: serde::Serialize>(&self, collection: &str, id: &str, model: &T) -> FirestoreResult<Document> {
        Ok(Document::named(
            self.client.full_document_name(collection, id),
            fields_from_model(model)?,
        ))
    }

    async fn clips_of(&self, project_id: &ProjectId, transaction: Option<&str>) -> FirestoreResult<Vec<Clip>> {
        let query = StructuredQuery::field_equals(CLIPS, "projectId", Value::string(project_id.as_str()));
        self.client
            .run_query(query, transaction)
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    /// Reads and writes for clip creation inside `tx`. Returns the writes to commit.
    async fn plan_clip_creation(
        &self,
        tx: &str,
        user_id: &UserId,
        project_id: &ProjectId,
        clips: &[Clip],
    ) -> FirestoreResult<(Vec<Write>, ClipCreation)> {
        let mut project: Project = self
            .load::<Project>(PROJECTS, project_id.as_str(), Some(tx))
            .await?
            .map(|(p, _)| p)
            .filter(|p: &Project| &p.user_id == user_id)
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", PROJECTS, project_id)))?;

        apply_project_status(&mut project, ProjectStatus::Processed, None);
        let project_write = Write::patch(
            self.named_doc(PROJECTS, project_id.as_str(), &project)?,
            PROJECT_STATUS_FIELDS,
        );

        let existing = self.clips_of(project_id, Some(tx)).await?;
        if !existing.is_empty() {
            return Ok((
                vec![project_write],
                ClipCreation::AlreadyPresent { clips: existing.len() },
            ));
        }

        let mut user: User = self
            .load::<User>(USERS, user_id.as_str(), Some(tx))
            .await?
            .map(|(u, _)| u)
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", USERS, user_id)))?;
        let before = user.credits;
        user.credits = before.saturating_sub(clip_cost(clips.len()));

        let mut writes = Vec::with_capacity(clips.len() + 2);
        for clip in clips {
            writes.push(Write::create(self.named_doc(CLIPS, clip.id.as_str(), clip)?));
        }
        writes.push(project_write);
        writes.push(Write::patch(
            self.named_doc(USERS, user_id.as_str(), &user)?,
            &["credits"],
        ));

        Ok((
            writes,
            ClipCreation::Created {
                clips: clips.len(),
                credits_debited: before - user.credits,
            },
        ))
    }

    async fn create_clips_once(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        clips: &[Clip],
    ) -> FirestoreResult<ClipCreation> {
        let tx = self.client.begin_transaction().await?;
        match self.plan_clip_creation(&tx, user_id, project_id, clips).await {
            Ok((writes, outcome)) => {
                self.client.commit(writes, Some(tx)).await?;
                Ok(outcome)
            }
            Err(e) => {
                self.client.rollback(tx).await;
                Err(e)
            }
        }
    }
}

/// Decode a document, filling `id` from the resource name when absent.
fn decode<T: serde::de::DeserializeOwned>(doc: &Document) -> FirestoreResult<T> {
    let mut doc = doc.clone();
    if let Some(id) = doc.doc_id().map(str::to_string) {
        doc.fields
            .get_or_insert_with(HashMap::new)
            .entry("id".to_string())
            .or_insert(Value::StringValue(id));
    }
    doc.to_model()
}

#[async_trait]
impl ProjectStore for FirestoreStore {
    async fn get_user(&self, user_id: &UserId) -> FirestoreResult<Option<User>> {
        Ok(self.load::<User>(USERS, user_id.as_str(), None).await?.map(|(u, _)| u))
    }

    async fn create_project(&self, project: &Project) -> FirestoreResult<()> {
        self.client
            .create_document(PROJECTS, project.id.as_str(), fields_from_model(project)?)
            .await?;
        info!(project_id = %project.id, user_id = %project.user_id, "Created project");
        Ok(())
    }

    async fn get_project(&self, project_id: &ProjectId) -> FirestoreResult<Option<Project>> {
        Ok(self.load::<Project>(PROJECTS, project_id.as_str(), None).await?.map(|(p, _)| p))
    }

    async fn update_project_status(
        &self,
        project_id: &ProjectId,
        status: ProjectStatus,
        failure_reason: Option<&str>,
    ) -> FirestoreResult<Project> {
        let mut patch = serde_json::json!({
            "status": status,
            "updatedAt": chrono::Utc::now(),
        });
        if let Some(reason) = failure_reason {
            patch["failureReason"] = serde_json::Value::String(reason.to_string());
        }

        let doc = self
            .client
            .with_retry("update_project_status", || {
                let fields = fields_from_model(&patch);
                async move {
                    self.client
                        .update_document(PROJECTS, project_id.as_str(), fields?, Some(PROJECT_STATUS_FIELDS), None)
                        .await
                }
            })
            .await?;
        decode(&doc)
    }

    async fn delete_project(&self, project_id: &ProjectId) -> FirestoreResult<()> {
        let clips = self.clips_of(project_id, None).await?;
        let mut writes: Vec<Write> = clips
            .iter()
            .map(|c| Write::delete(self.client.full_document_name(CLIPS, c.id.as_str())))
            .collect();
        writes.push(Write::delete(
            self.client.full_document_name(PROJECTS, project_id.as_str()),
        ));

        for chunk in writes.chunks(500) {
            self.client.commit(chunk.to_vec(), None).await?;
        }
        info!(project_id = %project_id, clips = clips.len(), "Deleted project");
        Ok(())
    }

    async fn list_clips(&self, project_id: &ProjectId) -> FirestoreResult<Vec<Clip>> {
        let mut clips = self
            .client
            .with_retry("list_clips", || self.clips_of(project_id, None))
            .await?;
        sort_clips(&mut clips);
        Ok(clips)
    }

    async fn get_clip(&self, clip_id: &ClipId) -> FirestoreResult<Option<Clip>> {
        Ok(self.load::<Clip>(CLIPS, clip_id.as_str(), None).await?.map(|(c, _)| c))
    }

    async fn create_clips_for_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        clips: Vec<Clip>,
    ) -> FirestoreResult<ClipCreation> {
        let outcome = self
            .client
            .with_retry("create_clips_for_project", || {
                self.create_clips_once(user_id, project_id, &clips)
            })
            .await?;
        info!(project_id = %project_id, ?outcome, "Stored delivered clips");
        Ok(outcome)
    }

    async fn save_clip_edit(
        &self,
        user_id: &UserId,
        clip_id: &ClipId,
        edit: ClipEdit,
        expected_version: Option<u64>,
    ) -> FirestoreResult<Clip> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut clip, doc): (Clip, Document) = self
                .load::<Clip>(CLIPS, clip_id.as_str(), None)
                .await?
                .filter(|(c, _): &(Clip, Document)| &c.user_id == user_id)
                .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", CLIPS, clip_id)))?;

            apply_edit(&mut clip, edit.clone(), expected_version)?;

            let result = self
                .client
                .update_document(
                    CLIPS,
                    clip_id.as_str(),
                    fields_from_model(&clip)?,
                    Some(CLIP_EDIT_FIELDS),
                    doc.update_time.as_deref(),
                )
                .await;

            match result {
                Ok(_) => return Ok(clip),
                Err(e) if e.is_precondition_failed() && attempt < MAX_EDIT_ATTEMPTS => {
                    warn!(clip_id = %clip_id, attempt, "Clip changed during save, re-reading");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn set_clip_render_status(
        &self,
        clip_id: &ClipId,
        status: ClipRenderStatus,
        rendered_url: Option<String>,
    ) -> FirestoreResult<Clip> {
        let (mut clip, doc): (Clip, Document) = self
            .load::<Clip>(CLIPS, clip_id.as_str(), None)
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", CLIPS, clip_id)))?;
        apply_render_status(&mut clip, status, rendered_url);

        self.client
            .update_document(
                CLIPS,
                clip_id.as_str(),
                fields_from_model(&clip)?,
                Some(CLIP_RENDER_FIELDS),
                doc.update_time.as_deref(),
            )
            .await?;
        Ok(clip)
    }
}
