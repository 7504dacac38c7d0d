//! Persistence for hookcut.
//!
//! This crate provides:
//! - A Firestore REST client with token caching, retries and transactions
//! - The [`ProjectStore`] trait over users, projects and clips
//! - [`FirestoreStore`] for production and [`MemoryStore`] for tests

pub mod client;
pub mod error;
pub mod firestore_store;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use firestore_store::FirestoreStore;
pub use memory::MemoryStore;
pub use retry::RetryConfig;
pub use store::{ClipCreation, ClipEdit, ProjectStore};
pub use types::{Document, Value};
