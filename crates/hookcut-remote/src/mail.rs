//! Transactional email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RemoteResult;
use crate::http::{EndpointConfig, JsonEndpoint};

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send_mail(&self, message: &MailMessage) -> RemoteResult<()>;
}

#[derive(Serialize)]
struct SendMailBody<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a MailMessage,
}

/// Mail provider reached over its HTTP API.
pub struct HttpMailer {
    endpoint: JsonEndpoint,
    from: String,
}

impl HttpMailer {
    pub fn new(config: EndpointConfig, from: impl Into<String>) -> RemoteResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new("mail", config)?,
            from: from.into(),
        })
    }

    /// `MAIL_URL`, `MAIL_TOKEN`, `MAIL_FROM`. Returns `None` when no mail
    /// provider is configured.
    pub fn from_env() -> RemoteResult<Option<Self>> {
        let config = EndpointConfig::from_env("MAIL", "");
        if config.url.is_empty() {
            return Ok(None);
        }
        let from = std::env::var("MAIL_FROM").unwrap_or_else(|_| "Hookcut <noreply@hookcut.app>".to_string());
        Self::new(config, from).map(Some)
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_mail(&self, message: &MailMessage) -> RemoteResult<()> {
        self.endpoint
            .post(&SendMailBody {
                from: &self.from,
                message,
            })
            .await?;
        info!(subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Stand-in used when no provider is configured: logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(&self, message: &MailMessage) -> RemoteResult<()> {
        info!(subject = %message.subject, "Mail provider not configured, skipping email");
        Ok(())
    }
}
