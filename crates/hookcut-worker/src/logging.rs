//! Structured workflow run logging.
//!
//! Every line carries the run id and workflow name so all attempts of one
//! run can be followed across workers.

use tracing::{error, info, warn, Span};

use hookcut_queue::EventEnvelope;

/// Logger bound to one delivery of a workflow run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    workflow: &'static str,
    attempt: u32,
}

impl RunLogger {
    pub fn new(envelope: &EventEnvelope) -> Self {
        Self {
            run_id: envelope.run_id.clone(),
            workflow: envelope.event.name(),
            attempt: envelope.attempt,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            workflow = self.workflow,
            attempt = self.attempt,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            workflow = self.workflow,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            workflow = self.workflow,
            attempt = self.attempt,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            workflow = self.workflow,
            attempt = self.attempt,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            workflow = self.workflow,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow(&self) -> &'static str {
        self.workflow
    }

    /// Span for attaching further fields to everything a run logs.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            workflow = self.workflow,
            attempt = self.attempt
        )
    }
}
