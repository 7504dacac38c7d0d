//! Project admission and dispatch.
//!
//! 1. Admission: the number of clips the owner can pay for decides whether
//!    the project proceeds. Zero affordable clips ends the run with status
//!    `no credits`; nothing external is called and no credits move.
//! 2. The project goes to `processing` and the job is dispatched to the
//!    processing service.
//! 3. A guardian check is scheduled for `guardian_timeout` later, whatever
//!    the processing service does.

use serde::{Deserialize, Serialize};

use hookcut_models::{CaptionStyle, ProjectId, ProjectStatus, UserId};
use hookcut_queue::{EventEnvelope, WorkflowEvent};
use hookcut_remote::ProcessingRequest;

use super::{Steps, WorkflowContext};
use crate::error::{WorkerError, WorkerResult};

/// Journaled admission decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
enum Admission {
    Admitted {
        clip_count: u32,
        source_key: String,
        style: CaptionStyle,
    },
    NoCredits,
    /// The project already left `queued`; another run handled it.
    Skipped { status: ProjectStatus },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionOutcome {
    Dispatched { clip_count: u32 },
    NoCredits,
    Skipped(ProjectStatus),
}

pub async fn run(
    ctx: &WorkflowContext,
    steps: &Steps<'_>,
    project_id: &ProjectId,
    user_id: &UserId,
) -> WorkerResult<AdmissionOutcome> {
    let admission = steps
        .run("admission", || admit(ctx, project_id, user_id))
        .await?;

    match admission {
        Admission::Skipped { status } => Ok(AdmissionOutcome::Skipped(status)),
        Admission::NoCredits => {
            steps
                .run("mark-no-credits", || {
                    set_status(ctx, project_id, ProjectStatus::NoCredits)
                })
                .await?;
            Ok(AdmissionOutcome::NoCredits)
        }
        Admission::Admitted {
            clip_count,
            source_key,
            style,
        } => {
            steps
                .run("mark-processing", || {
                    set_status(ctx, project_id, ProjectStatus::Processing)
                })
                .await?;

            let request = ProcessingRequest::new(
                user_id,
                project_id,
                source_key,
                clip_count,
                style,
                ctx.config.processing_webhook_url(),
            );
            steps.run("dispatch", || dispatch(ctx, &request)).await?;

            steps
                .run("schedule-guardian", || schedule_guardian(ctx, project_id))
                .await?;

            Ok(AdmissionOutcome::Dispatched { clip_count })
        }
    }
}

async fn admit(
    ctx: &WorkflowContext,
    project_id: &ProjectId,
    user_id: &UserId,
) -> WorkerResult<Admission> {
    let project = ctx
        .store
        .get_project_for_user(user_id, project_id)
        .await?
        .ok_or_else(|| WorkerError::ProjectNotFound(project_id.clone()))?;

    if project.status != ProjectStatus::Queued {
        return Ok(Admission::Skipped {
            status: project.status,
        });
    }

    let user = ctx
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| WorkerError::UserNotFound(user_id.to_string()))?;

    let clip_count = user.affordable_clip_count(project.clip_count);
    if clip_count == 0 {
        return Ok(Admission::NoCredits);
    }

    let source_key = project
        .source_ref()
        .ok_or_else(|| WorkerError::MissingSource(project_id.clone()))?
        .to_string();

    Ok(Admission::Admitted {
        clip_count,
        source_key,
        style: project.caption_style,
    })
}

async fn set_status(
    ctx: &WorkflowContext,
    project_id: &ProjectId,
    status: ProjectStatus,
) -> WorkerResult<()> {
    ctx.store
        .update_project_status(project_id, status, None)
        .await?;
    Ok(())
}

async fn dispatch(ctx: &WorkflowContext, request: &ProcessingRequest) -> WorkerResult<()> {
    ctx.processing.dispatch(request).await?;
    Ok(())
}

async fn schedule_guardian(ctx: &WorkflowContext, project_id: &ProjectId) -> WorkerResult<()> {
    let check = EventEnvelope::new(WorkflowEvent::GuardianCheck {
        project_id: project_id.clone(),
    });
    ctx.events
        .schedule(check, ctx.config.guardian_timeout)
        .await?;
    Ok(())
}
