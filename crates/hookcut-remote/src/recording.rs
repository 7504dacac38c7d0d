//! Recording fakes of the remote services, for tests and local runs.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use hookcut_models::RenderPayload;

use crate::error::{RemoteError, RemoteResult};
use crate::mail::{MailMessage, Mailer};
use crate::processing::{ProcessingRequest, ProcessingService};
use crate::render::RenderService;

/// Records every call. The next `fail_next` calls fail with a 503.
pub struct Recorder<T> {
    calls: Mutex<Vec<T>>,
    fail_next: AtomicU32,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_next: AtomicU32::new(0),
        }
    }

    pub fn failing(times: u32) -> Self {
        let recorder = Self::new();
        recorder.fail_next.store(times, Ordering::SeqCst);
        recorder
    }

    pub async fn calls(&self) -> Vec<T> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, service: &'static str, call: &T) -> RemoteResult<()> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::Status {
                service,
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.calls.lock().await.push(call.clone());
        Ok(())
    }
}

pub type RecordingProcessor = Recorder<ProcessingRequest>;
pub type RecordingRenderer = Recorder<RenderPayload>;
pub type RecordingMailer = Recorder<MailMessage>;

#[async_trait]
impl ProcessingService for Recorder<ProcessingRequest> {
    async fn dispatch(&self, request: &ProcessingRequest) -> RemoteResult<()> {
        self.record("processing", request).await
    }
}

#[async_trait]
impl RenderService for Recorder<RenderPayload> {
    async fn render(&self, payload: &RenderPayload) -> RemoteResult<()> {
        self.record("render", payload).await
    }
}

#[async_trait]
impl Mailer for Recorder<MailMessage> {
    async fn send_mail(&self, message: &MailMessage) -> RemoteResult<()> {
        self.record("mail", message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookcut_models::{CaptionStyle, ProjectId, UserId};

    #[tokio::test]
    async fn test_failing_recorder_recovers() {
        let processor = RecordingProcessor::failing(1);
        let request = ProcessingRequest::new(
            &UserId::from("u"),
            &ProjectId::from("p"),
            "k",
            1,
            CaptionStyle::Highlight,
            "w",
        );
        assert!(processor.dispatch(&request).await.is_err());
        assert!(processor.dispatch(&request).await.is_ok());
        assert_eq!(processor.calls().await.len(), 1);
    }
}
