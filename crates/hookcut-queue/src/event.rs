//! Workflow events and the envelope they travel in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hookcut_models::{ClipId, ProjectId, RenderPayload, UserId};

/// Something the worker must react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkflowEvent {
    /// A project was created and needs admission and dispatch.
    ProcessVideo {
        project_id: ProjectId,
        user_id: UserId,
    },
    /// Safety net fired after dispatch; resolves projects stuck in `processing`.
    GuardianCheck { project_id: ProjectId },
    /// Clips were stored; notify the owner.
    ProjectProcessed {
        project_id: ProjectId,
        user_id: UserId,
    },
    /// Record a terminal failure on the project.
    ProjectFailed { project_id: ProjectId, reason: String },
    /// Render one edited clip.
    GenerateVideo(RenderPayload),
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::ProcessVideo { .. } => "process-video",
            WorkflowEvent::GuardianCheck { .. } => "guardian-check",
            WorkflowEvent::ProjectProcessed { .. } => "project-processed",
            WorkflowEvent::ProjectFailed { .. } => "project-failed",
            WorkflowEvent::GenerateVideo(_) => "generate-video",
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        match self {
            WorkflowEvent::ProcessVideo { project_id, .. }
            | WorkflowEvent::GuardianCheck { project_id }
            | WorkflowEvent::ProjectProcessed { project_id, .. }
            | WorkflowEvent::ProjectFailed { project_id, .. } => project_id,
            WorkflowEvent::GenerateVideo(payload) => &payload.project_id,
        }
    }

    pub fn clip_id(&self) -> Option<&ClipId> {
        match self {
            WorkflowEvent::GenerateVideo(payload) => Some(&payload.clip_id),
            _ => None,
        }
    }

    /// Runs sharing a key never execute concurrently. Project admission is
    /// serialized per user so two runs cannot race on one credit balance.
    pub fn concurrency_key(&self) -> Option<String> {
        match self {
            WorkflowEvent::ProcessVideo { user_id, .. } => Some(format!("process-video:{}", user_id)),
            _ => None,
        }
    }
}

/// Delivery unit on the stream.
///
/// `run_id` stays fixed across retries of the same run so journaled step
/// outputs can be replayed; `event_id` is unique per delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: String,
    pub run_id: String,
    /// Zero for the first delivery.
    pub attempt: u32,
    pub event: WorkflowEvent,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: WorkflowEvent) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            attempt: 0,
            event,
            created_at: Utc::now(),
        }
    }

    /// The same run, delivered again.
    pub fn next_attempt(&self) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            run_id: self.run_id.clone(),
            attempt: self.attempt + 1,
            event: self.event.clone(),
            created_at: Utc::now(),
        }
    }

    /// Re-delivery that does not count as a retry (lease contention).
    pub fn redelivery(&self) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}
