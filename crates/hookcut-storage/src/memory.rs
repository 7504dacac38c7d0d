//! In-memory [`ObjectStore`] for tests and local runs.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StorageResult;
use crate::keys::validate_key;
use crate::store::{ObjectStore, PresignedUpload};

#[derive(Default)]
pub struct MemoryObjectStore {
    keys: Mutex<BTreeSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an object was uploaded.
    pub async fn put(&self, key: impl Into<String>) {
        self.keys.lock().await.insert(key.into());
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.keys.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presign_put(&self, key: &str, content_type: &str) -> StorageResult<PresignedUpload> {
        validate_key(key)?;
        Ok(PresignedUpload {
            url: format!("memory://bucket/{}?content-type={}", key, content_type),
            key: key.to_string(),
            expires_in_secs: 3600,
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.keys.lock().await.remove(key);
        Ok(())
    }

    async fn list_objects_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys
            .lock()
            .await
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32> {
        let mut stored = self.keys.lock().await;
        for key in keys {
            stored.remove(key);
        }
        Ok(keys.len() as u32)
    }
}
