//! Seams between the workflow engine and its durable state.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueResult;
use crate::event::{EventEnvelope, WorkflowEvent};

#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    /// Append an envelope to the event stream. Returns the stream entry id.
    async fn publish(&self, envelope: EventEnvelope) -> QueueResult<String>;

    /// Deliver `envelope` once `delay` has elapsed. Survives process restarts.
    async fn schedule(&self, envelope: EventEnvelope, delay: Duration) -> QueueResult<()>;

    /// Start a new run for `event`.
    async fn emit(&self, event: WorkflowEvent) -> QueueResult<String> {
        self.publish(EventEnvelope::new(event)).await
    }
}

/// Recorded step outputs, keyed by `(run_id, step)`.
#[async_trait]
pub trait StepJournal: Send + Sync + 'static {
    async fn load(&self, run_id: &str, step: &str) -> QueueResult<Option<serde_json::Value>>;

    async fn record(&self, run_id: &str, step: &str, output: &serde_json::Value) -> QueueResult<()>;
}

/// Keyed mutual exclusion with expiry, so a crashed holder cannot block forever.
#[async_trait]
pub trait ConcurrencyLimiter: Send + Sync + 'static {
    /// Take the lease for `key` unless someone else holds it.
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> QueueResult<bool>;

    /// Release the lease if `holder` still owns it.
    async fn release(&self, key: &str, holder: &str) -> QueueResult<()>;
}
