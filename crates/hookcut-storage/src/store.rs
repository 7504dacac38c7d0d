//! The object storage seam used by the API.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::StorageResult;

/// A presigned PUT the browser uploads the source video to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub url: String,
    pub key: String,
    pub expires_in_secs: u64,
}

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn presign_put(&self, key: &str, content_type: &str) -> StorageResult<PresignedUpload>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    async fn list_objects_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Returns the number of keys submitted for deletion.
    async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32>;

    /// Delete everything under `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<u32> {
        let keys = self.list_objects_by_prefix(prefix).await?;
        debug!(prefix, count = keys.len(), "Deleting prefix");
        if keys.is_empty() {
            return Ok(0);
        }
        self.delete_objects(&keys).await
    }
}
