//! Workflow event bus for hookcut.
//!
//! This crate provides:
//! - [`WorkflowEvent`] and the [`EventEnvelope`] it is delivered in
//! - Publisher, step journal and concurrency lease traits
//! - A Redis implementation (streams, delayed sorted set, DLQ, leases)
//! - An in-memory implementation for tests

pub mod bus;
pub mod error;
pub mod event;
pub mod memory;
pub mod redis_bus;

pub use bus::{ConcurrencyLimiter, EventPublisher, StepJournal};
pub use error::{QueueError, QueueResult};
pub use event::{EventEnvelope, WorkflowEvent};
pub use memory::MemoryEventBus;
pub use redis_bus::{Delivery, QueueConfig, RedisEventBus};
