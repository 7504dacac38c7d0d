//! Shared bearer-authenticated JSON POST with transport retries.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{RemoteError, RemoteResult};

/// Connection settings common to every outbound service.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Full URL the request is POSTed to.
    pub url: String,
    /// Bearer token; omitted from the request when empty.
    pub token: String,
    pub timeout: Duration,
    /// Retries for transport-level failures only.
    pub max_retries: u32,
}

impl EndpointConfig {
    /// Read `{prefix}_URL`, `{prefix}_TOKEN`, `{prefix}_TIMEOUT_SECS` and
    /// `{prefix}_RETRIES`.
    pub fn from_env(prefix: &str, default_url: &str) -> Self {
        let var = |name: &str| std::env::var(format!("{prefix}_{name}")).ok();
        Self {
            url: var("URL").unwrap_or_else(|| default_url.to_string()),
            token: var("TOKEN").unwrap_or_default(),
            timeout: Duration::from_secs(
                var("TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: var("RETRIES").and_then(|s| s.parse().ok()).unwrap_or(2),
        }
    }
}

/// JSON poster bound to one endpoint.
#[derive(Debug, Clone)]
pub(crate) struct JsonEndpoint {
    service: &'static str,
    http: Client,
    config: EndpointConfig,
}

impl JsonEndpoint {
    pub(crate) fn new(service: &'static str, config: EndpointConfig) -> RemoteResult<Self> {
        if config.url.trim().is_empty() {
            return Err(RemoteError::Config(format!("{service} URL is empty")));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RemoteError::Network)?;
        Ok(Self {
            service,
            http,
            config,
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.config.url
    }

    /// POST `body`; any non-2xx status is an error.
    pub(crate) async fn post<B: Serialize + ?Sized>(&self, body: &B) -> RemoteResult<()> {
        debug!(service = self.service, url = %self.config.url, "POST");

        let response = self
            .with_retry(|| async {
                let mut request = self.http.post(&self.config.url).json(body);
                if !self.config.token.is_empty() {
                    request = request.bearer_auth(&self.config.token);
                }
                request.send().await.map_err(|e| {
                    if e.is_timeout() {
                        RemoteError::Timeout(self.config.timeout.as_secs())
                    } else {
                        RemoteError::Network(e)
                    }
                })
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> RemoteResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RemoteResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        service = self.service,
                        "request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
