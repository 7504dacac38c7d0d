//! Hands an edited clip to the render service.
//!
//! The service reports back on `/webhooks/video-generated`; until then the
//! clip stays in `processing`.

use serde::{Deserialize, Serialize};
use tracing::info;

use hookcut_models::RenderPayload;

use super::{Steps, WorkflowContext};
use crate::error::WorkerResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenderOutcome {
    Requested,
}

pub async fn run(
    ctx: &WorkflowContext,
    steps: &Steps<'_>,
    payload: &RenderPayload,
) -> WorkerResult<RenderOutcome> {
    steps.run("render", || request(ctx, payload)).await
}

async fn request(ctx: &WorkflowContext, payload: &RenderPayload) -> WorkerResult<RenderOutcome> {
    ctx.renderer.render(payload).await?;
    info!(
        clip_id = %payload.clip_id,
        project_id = %payload.project_id,
        "Render requested"
    );
    Ok(RenderOutcome::Requested)
}
