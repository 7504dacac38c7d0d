//! Safety net for lost webhooks.
//!
//! A project still in `processing` when the check fires is failed with
//! [`TIMEOUT_REASON`]. Any other status is left untouched.

use serde::{Deserialize, Serialize};
use tracing::warn;

use hookcut_models::{ProjectId, ProjectStatus};

use super::{Steps, WorkflowContext};
use crate::error::WorkerResult;
use crate::metrics;

/// Distinguishes "never called back" from failures the service reported.
pub const TIMEOUT_REASON: &str = "timed out";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardianOutcome {
    TimedOut,
    Settled { status: ProjectStatus },
    ProjectMissing,
}

pub async fn run(
    ctx: &WorkflowContext,
    steps: &Steps<'_>,
    project_id: &ProjectId,
) -> WorkerResult<GuardianOutcome> {
    steps.run("guardian", || check(ctx, project_id)).await
}

async fn check(ctx: &WorkflowContext, project_id: &ProjectId) -> WorkerResult<GuardianOutcome> {
    let Some(project) = ctx.store.get_project(project_id).await? else {
        return Ok(GuardianOutcome::ProjectMissing);
    };

    if project.status != ProjectStatus::Processing {
        return Ok(GuardianOutcome::Settled {
            status: project.status,
        });
    }

    ctx.store
        .update_project_status(project_id, ProjectStatus::Failed, Some(TIMEOUT_REASON))
        .await?;
    metrics::record_guardian_timeout();
    warn!(project_id = %project_id, "No result from processing service, project timed out");
    Ok(GuardianOutcome::TimedOut)
}
