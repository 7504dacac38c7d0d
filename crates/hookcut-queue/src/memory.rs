//! In-process bus for tests and single-node development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::bus::{ConcurrencyLimiter, EventPublisher, StepJournal};
use crate::error::{QueueError, QueueResult};
use crate::event::{EventEnvelope, WorkflowEvent};

#[derive(Default)]
pub struct MemoryEventBus {
    published: Mutex<Vec<EventEnvelope>>,
    scheduled: Mutex<Vec<(EventEnvelope, Duration)>>,
    journal: Mutex<HashMap<(String, String), serde_json::Value>>,
    leases: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<EventEnvelope> {
        self.published.lock().await.clone()
    }

    pub async fn published_events(&self) -> Vec<WorkflowEvent> {
        self.published
            .lock()
            .await
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    /// Remove and return everything published so far.
    pub async fn take_published(&self) -> Vec<EventEnvelope> {
        std::mem::take(&mut *self.published.lock().await)
    }

    pub async fn scheduled(&self) -> Vec<(EventEnvelope, Duration)> {
        self.scheduled.lock().await.clone()
    }

    pub async fn take_scheduled(&self) -> Vec<(EventEnvelope, Duration)> {
        std::mem::take(&mut *self.scheduled.lock().await)
    }

    /// While set, publishing and scheduling fail as if Redis were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> QueueResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::publish_failed("event bus unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> QueueResult<String> {
        self.check_available()?;
        let mut published = self.published.lock().await;
        published.push(envelope);
        Ok(format!("{}-0", published.len()))
    }

    async fn schedule(&self, envelope: EventEnvelope, delay: Duration) -> QueueResult<()> {
        self.check_available()?;
        self.scheduled.lock().await.push((envelope, delay));
        Ok(())
    }
}

#[async_trait]
impl StepJournal for MemoryEventBus {
    async fn load(&self, run_id: &str, step: &str) -> QueueResult<Option<serde_json::Value>> {
        Ok(self
            .journal
            .lock()
            .await
            .get(&(run_id.to_string(), step.to_string()))
            .cloned())
    }

    async fn record(&self, run_id: &str, step: &str, output: &serde_json::Value) -> QueueResult<()> {
        self.journal
            .lock()
            .await
            .insert((run_id.to_string(), step.to_string()), output.clone());
        Ok(())
    }
}

#[async_trait]
impl ConcurrencyLimiter for MemoryEventBus {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> QueueResult<bool> {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();
        match leases.get(key) {
            Some((current, expires)) if *expires > now && current != holder => Ok(false),
            _ => {
                leases.insert(key.to_string(), (holder.to_string(), now + ttl));
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str, holder: &str) -> QueueResult<()> {
        let mut leases = self.leases.lock().await;
        if leases.get(key).is_some_and(|(current, _)| current == holder) {
            leases.remove(key);
        }
        Ok(())
    }
}
