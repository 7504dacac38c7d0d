//! Terminal project failure. Safe to apply any number of times.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hookcut_models::{ProjectId, ProjectStatus};

use super::{Steps, WorkflowContext};
use crate::error::WorkerResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FailureOutcome {
    Recorded,
    ProjectMissing,
}

pub async fn run(
    ctx: &WorkflowContext,
    steps: &Steps<'_>,
    project_id: &ProjectId,
    reason: &str,
) -> WorkerResult<FailureOutcome> {
    steps
        .run("mark-failed", || mark_failed(ctx, project_id, reason))
        .await
}

/// Set the project to `failed` with `reason`.
pub async fn mark_failed(
    ctx: &WorkflowContext,
    project_id: &ProjectId,
    reason: &str,
) -> WorkerResult<FailureOutcome> {
    if ctx.store.get_project(project_id).await?.is_none() {
        warn!(project_id = %project_id, "Cannot record failure, project no longer exists");
        return Ok(FailureOutcome::ProjectMissing);
    }

    ctx.store
        .update_project_status(project_id, ProjectStatus::Failed, Some(reason))
        .await?;
    info!(project_id = %project_id, reason, "Project marked failed");
    Ok(FailureOutcome::Recorded)
}
