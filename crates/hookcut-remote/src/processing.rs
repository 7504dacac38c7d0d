//! Dispatch of project processing jobs.
//!
//! The service acknowledges acceptance with a 2xx; results arrive later on
//! `/webhooks/modal`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use hookcut_models::{CaptionStyle, ProjectId, UserId};

use crate::error::RemoteResult;
use crate::http::{EndpointConfig, JsonEndpoint};

/// Body of the processing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRequest {
    pub source_key: String,
    /// Opaque `{userId}/{projectId}` pair echoed back in the webhook.
    pub ids: String,
    pub clip_count: u32,
    pub style: CaptionStyle,
    pub webhook_url: String,
}

impl ProcessingRequest {
    pub fn new(
        user_id: &UserId,
        project_id: &ProjectId,
        source_key: impl Into<String>,
        clip_count: u32,
        style: CaptionStyle,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            ids: format!("{}/{}", user_id, project_id),
            clip_count,
            style,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
pub trait ProcessingService: Send + Sync + 'static {
    async fn dispatch(&self, request: &ProcessingRequest) -> RemoteResult<()>;
}

pub struct ProcessingClient {
    endpoint: JsonEndpoint,
}

impl ProcessingClient {
    pub fn new(config: EndpointConfig) -> RemoteResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new("processing", config)?,
        })
    }

    /// `PROCESSING_URL`, `PROCESSING_TOKEN`, ...
    pub fn from_env() -> RemoteResult<Self> {
        Self::new(EndpointConfig::from_env("PROCESSING", "http://localhost:8001/process"))
    }
}

#[async_trait]
impl ProcessingService for ProcessingClient {
    async fn dispatch(&self, request: &ProcessingRequest) -> RemoteResult<()> {
        self.endpoint.post(request).await?;
        info!(
            ids = %request.ids,
            clip_count = request.clip_count,
            url = self.endpoint.url(),
            "Processing job accepted"
        );
        Ok(())
    }
}
