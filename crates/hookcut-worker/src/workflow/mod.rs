//! Workflows run by the worker, one per [`WorkflowEvent`] kind.
//!
//! A workflow is a sequence of named steps. Each step's output is journaled
//! under `(run_id, step)` before the next step starts, so a retried run
//! replays completed steps from the journal instead of repeating their side
//! effects (a second dispatch to the processing service, a second email).

pub mod failure;
pub mod guardian;
pub mod notify;
pub mod process_video;
pub mod render;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use hookcut_firestore::ProjectStore;
use hookcut_models::{ClipRenderStatus, ProjectStatus};
use hookcut_queue::{EventEnvelope, EventPublisher, StepJournal, WorkflowEvent};
use hookcut_remote::{Mailer, ProcessingService, RenderService};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

pub use failure::FailureOutcome;
pub use guardian::GuardianOutcome;
pub use notify::NotifyOutcome;
pub use process_video::AdmissionOutcome;
pub use render::RenderOutcome;

/// Everything a workflow step may touch.
pub struct WorkflowContext {
    pub config: WorkerConfig,
    pub store: Arc<dyn ProjectStore>,
    pub events: Arc<dyn EventPublisher>,
    pub journal: Arc<dyn StepJournal>,
    pub processing: Arc<dyn ProcessingService>,
    pub renderer: Arc<dyn RenderService>,
    pub mailer: Arc<dyn Mailer>,
}

/// Journaled step runner for one run.
pub struct Steps<'a> {
    journal: &'a dyn StepJournal,
    run_id: &'a str,
}

impl<'a> Steps<'a> {
    pub fn new(journal: &'a dyn StepJournal, run_id: &'a str) -> Self {
        Self { journal, run_id }
    }

    /// Run `step` once per run: a recorded output is returned as is.
    pub async fn run<T, F, Fut>(&self, step: &'static str, f: F) -> WorkerResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = WorkerResult<T>>,
    {
        if let Some(recorded) = self.journal.load(self.run_id, step).await? {
            let output = serde_json::from_value(recorded).map_err(|e| WorkerError::Journal {
                step: step.to_string(),
                message: e.to_string(),
            })?;
            debug!(run_id = %self.run_id, step, "Replayed step from journal");
            metrics::record_step(step, "replayed");
            return Ok(output);
        }

        let output = f().await?;
        let recorded = serde_json::to_value(&output).map_err(|e| WorkerError::Journal {
            step: step.to_string(),
            message: e.to_string(),
        })?;
        self.journal.record(self.run_id, step, &recorded).await?;
        metrics::record_step(step, "executed");
        Ok(output)
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Admission(AdmissionOutcome),
    Guardian(GuardianOutcome),
    Failure(FailureOutcome),
    Notify(NotifyOutcome),
    Render(RenderOutcome),
}

/// Execute the workflow for one delivery.
pub async fn run(ctx: &WorkflowContext, envelope: &EventEnvelope) -> WorkerResult<WorkflowOutcome> {
    let steps = Steps::new(ctx.journal.as_ref(), &envelope.run_id);
    match &envelope.event {
        WorkflowEvent::ProcessVideo {
            project_id,
            user_id,
        } => process_video::run(ctx, &steps, project_id, user_id)
            .await
            .map(WorkflowOutcome::Admission),
        WorkflowEvent::GuardianCheck { project_id } => guardian::run(ctx, &steps, project_id)
            .await
            .map(WorkflowOutcome::Guardian),
        WorkflowEvent::ProjectFailed { project_id, reason } => {
            failure::run(ctx, &steps, project_id, reason)
                .await
                .map(WorkflowOutcome::Failure)
        }
        WorkflowEvent::ProjectProcessed {
            project_id,
            user_id,
        } => notify::run(ctx, &steps, project_id, user_id)
            .await
            .map(WorkflowOutcome::Notify),
        WorkflowEvent::GenerateVideo(payload) => render::run(ctx, &steps, payload)
            .await
            .map(WorkflowOutcome::Render),
    }
}

/// Catch path once a run has failed for good: record a terminal state so
/// nothing is left in `processing`.
pub async fn on_exhausted(
    ctx: &WorkflowContext,
    event: &WorkflowEvent,
    error: &WorkerError,
) -> WorkerResult<()> {
    match event {
        WorkflowEvent::ProcessVideo { project_id, .. } => {
            // Clips may have arrived while retries were pending.
            match ctx.store.get_project(project_id).await? {
                Some(project)
                    if matches!(
                        project.status,
                        ProjectStatus::Queued | ProjectStatus::Processing
                    ) =>
                {
                    let reason = format!("processing failed: {}", error);
                    failure::mark_failed(ctx, project_id, &reason).await?;
                }
                Some(project) => {
                    info!(
                        project_id = %project_id,
                        status = %project.status,
                        "Project already settled, leaving status as is"
                    );
                }
                None => {}
            }
        }
        WorkflowEvent::GenerateVideo(payload) => {
            ctx.store
                .set_clip_render_status(&payload.clip_id, ClipRenderStatus::Failed, None)
                .await?;
        }
        // Guardian and failure runs only ever write a terminal state
        // themselves; a lost notification is not a project failure.
        WorkflowEvent::GuardianCheck { .. }
        | WorkflowEvent::ProjectFailed { .. }
        | WorkflowEvent::ProjectProcessed { .. } => {}
    }
    Ok(())
}
