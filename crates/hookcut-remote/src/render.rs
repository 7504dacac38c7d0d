//! Trigger for single-clip renders.

use async_trait::async_trait;
use tracing::info;

use hookcut_models::RenderPayload;

use crate::error::RemoteResult;
use crate::http::{EndpointConfig, JsonEndpoint};

#[async_trait]
pub trait RenderService: Send + Sync + 'static {
    async fn render(&self, payload: &RenderPayload) -> RemoteResult<()>;
}

pub struct RenderClient {
    endpoint: JsonEndpoint,
}

impl RenderClient {
    pub fn new(config: EndpointConfig) -> RemoteResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new("render", config)?,
        })
    }

    /// `RENDER_URL`, `RENDER_TOKEN`, ...
    pub fn from_env() -> RemoteResult<Self> {
        Self::new(EndpointConfig::from_env("RENDER", "http://localhost:8002/render"))
    }
}

#[async_trait]
impl RenderService for RenderClient {
    async fn render(&self, payload: &RenderPayload) -> RemoteResult<()> {
        self.endpoint.post(payload).await?;
        info!(clip_id = %payload.clip_id, "Render job accepted");
        Ok(())
    }
}
