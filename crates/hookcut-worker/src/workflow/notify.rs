//! "Your clips are ready" email to the project owner.

use serde::{Deserialize, Serialize};
use tracing::warn;

use hookcut_models::{ProjectId, User, UserId};
use hookcut_remote::MailMessage;

use super::{Steps, WorkflowContext};
use crate::error::WorkerResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Sent { to: String, clips: usize },
    Skipped { reason: String },
}

pub async fn run(
    ctx: &WorkflowContext,
    steps: &Steps<'_>,
    project_id: &ProjectId,
    user_id: &UserId,
) -> WorkerResult<NotifyOutcome> {
    steps
        .run("send-email", || send(ctx, project_id, user_id))
        .await
}

async fn send(
    ctx: &WorkflowContext,
    project_id: &ProjectId,
    user_id: &UserId,
) -> WorkerResult<NotifyOutcome> {
    let Some(user) = ctx.store.get_user(user_id).await? else {
        warn!(user_id = %user_id, "Owner not found, skipping notification");
        return Ok(skipped("owner not found"));
    };
    if user.email.trim().is_empty() {
        return Ok(skipped("owner has no email address"));
    }
    if ctx
        .store
        .get_project_for_user(user_id, project_id)
        .await?
        .is_none()
    {
        return Ok(skipped("project not found"));
    }

    let clips = ctx.store.list_clips(project_id).await?.len();
    let link = ctx.config.project_url(project_id.as_str());
    let message = clips_ready_message(&user, clips, &link);
    ctx.mailer.send_mail(&message).await?;

    Ok(NotifyOutcome::Sent {
        to: message.to,
        clips,
    })
}

fn skipped(reason: &str) -> NotifyOutcome {
    NotifyOutcome::Skipped {
        reason: reason.to_string(),
    }
}

fn clips_ready_message(user: &User, clips: usize, link: &str) -> MailMessage {
    let name = user.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let greeting = |name: Option<String>| match name {
        Some(name) => format!("Hi {},", name),
        None => "Hi,".to_string(),
    };
    let count = if clips == 1 {
        "1 clip is".to_string()
    } else {
        format!("{} clips are", clips)
    };

    MailMessage {
        to: user.email.clone(),
        subject: "Your clips are ready".to_string(),
        text: format!(
            "{}\n\n{} ready to review and edit.\n\nOpen your project: {}\n",
            greeting(name.map(String::from)),
            count,
            link
        ),
        html: format!(
            "<p>{}</p><p>{} ready to review and edit.</p><p><a href=\"{}\">Open your project</a></p>",
            greeting(name.map(escape_html)),
            count,
            escape_html(link)
        ),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
