//! Object storage for hookcut.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait (presigned uploads, deletion, prefix listing)
//! - [`R2Client`], an S3-API implementation for Cloudflare R2
//! - [`MemoryObjectStore`] for tests
//! - The key layout for uploads and project artifacts

pub mod client;
pub mod error;
pub mod keys;
pub mod memory;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryObjectStore;
pub use store::{ObjectStore, PresignedUpload};
