//! R2 client implementation.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::keys::validate_key;
use crate::store::{ObjectStore, PresignedUpload};

/// S3 DeleteObjects accepts at most this many keys per call.
const DELETE_BATCH: usize = 1000;

#[derive(Debug, Clone)]
pub struct R2Config {
    /// S3 API endpoint
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Lifetime of presigned upload URLs.
    pub presign_expiry: Duration,
}

impl R2Config {
    pub fn from_env() -> StorageResult<Self> {
        let presign_secs: u64 = std::env::var("R2_PRESIGN_EXPIRY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        Ok(Self {
            endpoint_url: std::env::var("R2_ENDPOINT_URL")
                .map_err(|_| StorageError::not_configured("R2_ENDPOINT_URL"))?,
            access_key_id: std::env::var("R2_ACCESS_KEY_ID")
                .map_err(|_| StorageError::not_configured("R2_ACCESS_KEY_ID"))?,
            secret_access_key: std::env::var("R2_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::not_configured("R2_SECRET_ACCESS_KEY"))?,
            bucket_name: std::env::var("R2_BUCKET_NAME")
                .map_err(|_| StorageError::not_configured("R2_BUCKET_NAME"))?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            presign_expiry: Duration::from_secs(presign_secs),
        })
    }
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    presign_expiry: Duration,
}

impl R2Client {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            presign_expiry: config.presign_expiry,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn presign_put(&self, key: &str, content_type: &str) -> StorageResult<PresignedUpload> {
        validate_key(key)?;
        let presign_config = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| StorageError::presign(key, e))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign(key, e))?;

        debug!(key, "Presigned upload");
        Ok(PresignedUpload {
            url: presigned.uri().to_string(),
            key: key.to_string(),
            expires_in_secs: self.presign_expiry.as_secs(),
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(StorageError::delete)?;

        Ok(())
    }

    async fn list_objects_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        debug!("Listing objects with prefix: {}", prefix);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::list(prefix, e))?;

            if let Some(ref contents) = response.contents {
                keys.extend(contents.iter().filter_map(|o| o.key.clone()));
            }

            if response.is_truncated() == Some(true) && response.next_continuation_token.is_some() {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<u32> {
        let mut deleted = 0u32;

        for chunk in keys.chunks(DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|k| {
                    ObjectIdentifier::builder()
                        .key(k)
                        .build()
                        .map_err(StorageError::delete)
                })
                .collect::<StorageResult<Vec<_>>>()?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(StorageError::delete)?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(StorageError::delete)?;

            deleted += chunk.len() as u32;
        }

        if deleted > 0 {
            info!("Deleted {} objects", deleted);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_requires_endpoint() {
        std::env::remove_var("R2_ENDPOINT_URL");
        assert!(matches!(R2Config::from_env(), Err(StorageError::NotConfigured(_))));
    }
}
