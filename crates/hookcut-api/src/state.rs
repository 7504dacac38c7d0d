//! Application state.

use std::sync::Arc;

use hookcut_firestore::{FirestoreStore, ProjectStore};
use hookcut_queue::{EventPublisher, RedisEventBus};
use hookcut_storage::{ObjectStore, R2Client};

use crate::config::ApiConfig;
use crate::webhook_auth::WebhookVerifier;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn ProjectStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub events: Arc<dyn EventPublisher>,
    /// Set when events go through Redis, for readiness checks.
    pub redis: Option<Arc<RedisEventBus>>,
    pub processing_webhook: WebhookVerifier,
    pub render_webhook: WebhookVerifier,
}

impl AppState {
    /// State over explicit backends.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn ProjectStore>,
        objects: Arc<dyn ObjectStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        let processing_webhook =
            WebhookVerifier::new("modal", config.processing_webhook_secret.clone());
        let render_webhook =
            WebhookVerifier::new("video-generated", config.render_webhook_secret.clone());
        Self {
            config,
            store,
            objects,
            events,
            redis: None,
            processing_webhook,
            render_webhook,
        }
    }

    /// Production state: Firestore, R2 and the Redis event bus.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = FirestoreStore::from_env().await?;
        let objects = R2Client::from_env()?;
        let bus = Arc::new(RedisEventBus::from_env()?);
        bus.init().await?;

        let mut state = Self::new(
            config,
            Arc::new(store),
            Arc::new(objects),
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
        );
        state.redis = Some(bus);
        Ok(state)
    }
}
