//! Firestore REST API client.
//!
//! Thin typed wrapper over the v1 REST surface used by the stores:
//! - Cached service-account tokens, refreshed once on `ACCESS_TOKEN_EXPIRED`
//! - Per-request tracing spans and latency/status metrics
//! - Read-write transactions (begin, transactional reads, commit, rollback)
//! - Emulator support via `FIRESTORE_EMULATOR_HOST`

use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::collections::HashMap;
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_request, record_transaction};
use crate::retry::RetryConfig;
use crate::token_cache::TokenCache;
use crate::types::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse, Document,
    RollbackRequest, RunQueryRequest, RunQueryResponse, StructuredQuery, Value, Write,
};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    /// `host:port` of a local emulator; disables service-account auth.
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    /// `.../v1/projects/{p}/databases/{d}/documents`
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        match config.emulator_host.clone() {
            Some(host) => {
                let root = format!("http://{}", host);
                Self::with_endpoint(config, &root, TokenCache::fixed("owner"))
            }
            None => {
                let auth = Self::create_auth_provider()?;
                Self::with_endpoint(config, "https://firestore.googleapis.com", TokenCache::new(auth))
            }
        }
    }

    /// Build a client against an explicit API root (emulator, tests).
    pub fn with_endpoint(
        config: FirestoreConfig,
        api_root: &str,
        token_cache: TokenCache,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("hookcut-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            api_root.trim_end_matches('/'),
            config.project_id,
            config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(token_cache),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.config.retry
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Full resource name, as used in writes.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    // =========================================================================
    // Documents
    // =========================================================================

    /// Get a document, optionally as part of a transaction.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
        transaction: Option<&str>,
    ) -> FirestoreResult<Option<Document>> {
        let mut url = self.document_path(collection, doc_id);
        if let Some(tx) = transaction {
            url = format!("{}?transaction={}", url, urlencoding::encode(tx));
        }

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self.send(|token| self.http.get(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Patch an existing document.
    ///
    /// Fields listed in `mask` but absent from `fields` are removed. When
    /// `update_time` is given the write only applies if the stored document
    /// was last written at that time.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        mask: Option<&[&str]>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = mask
            .unwrap_or_default()
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", f))
            .collect();
        match update_time {
            Some(ts) => params.push(format!("currentDocument.updateTime={}", urlencoding::encode(ts))),
            None => params.push("currentDocument.exists=true".to_string()),
        }
        let url = format!("{}?{}", self.document_path(collection, doc_id), params.join("&"));
        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .send(|token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                StatusCode::PRECONDITION_FAILED => {
                    let body_text = response.text().await.unwrap_or_default();
                    Err(FirestoreError::PreconditionFailed(body_text))
                }
                // The emulator reports a stale updateTime as FAILED_PRECONDITION/400.
                StatusCode::BAD_REQUEST => {
                    let body_text = response.text().await.unwrap_or_default();
                    if body_text.contains("FAILED_PRECONDITION") {
                        Err(FirestoreError::PreconditionFailed(body_text))
                    } else {
                        Err(FirestoreError::request_failed(format!("{} failed: {}", url, body_text)))
                    }
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Missing documents count as deleted.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self.send(|token| self.http.delete(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Run a structured query over root collections.
    pub async fn run_query(
        &self,
        query: StructuredQuery,
        transaction: Option<&str>,
    ) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
            transaction: transaction.map(str::to_string),
        };

        self.execute_request("run_query", &collection, None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    let responses: Vec<RunQueryResponse> =
                        serde_json::from_str(&body).map_err(|e| {
                            FirestoreError::InvalidResponse(format!(
                                "runQuery: {} (body prefix: {})",
                                e,
                                body.chars().take(200).collect::<String>()
                            ))
                        })?;
                    Ok(responses.into_iter().filter_map(|r| r.document).collect())
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub async fn begin_transaction(&self) -> FirestoreResult<String> {
        let url = format!("{}:beginTransaction", self.base_url);
        let request = BeginTransactionRequest::read_write();

        self.execute_request("begin_transaction", "transaction", None, async {
            let response = self
                .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let begun: BeginTransactionResponse = response.json().await?;
                    Ok(begun.transaction)
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Apply `writes` atomically, inside `transaction` when given.
    pub async fn commit(
        &self,
        writes: Vec<Write>,
        transaction: Option<String>,
    ) -> FirestoreResult<CommitResponse> {
        if writes.len() > 500 {
            return Err(FirestoreError::request_failed("Commit exceeds 500 write limit"));
        }
        let url = format!("{}:commit", self.base_url);
        let in_transaction = transaction.is_some();
        let request = CommitRequest { writes, transaction };

        let result = self
            .execute_request("commit", "transaction", None, async {
                let response = self
                    .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                    .await?;
                match response.status() {
                    StatusCode::OK => Ok(response.json::<CommitResponse>().await?),
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
            .await;

        if in_transaction && result.is_ok() {
            record_transaction("committed");
        }
        result
    }

    /// Release a transaction's locks. Failures are logged, not returned.
    pub async fn rollback(&self, transaction: String) {
        let url = format!("{}:rollback", self.base_url);
        let request = RollbackRequest { transaction };

        let result = self
            .execute_request("rollback", "transaction", None, async {
                let response = self
                    .send(|token| self.http.post(&url).bearer_auth(token).json(&request))
                    .await?;
                match response.status() {
                    StatusCode::OK => Ok(()),
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
            .await;

        record_transaction("rolled_back");
        if let Err(e) = result {
            tracing::warn!(error = %e, "Firestore rollback failed");
        }
    }

    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Send a request, refreshing the token once if Firestore reports it expired.
    async fn send<B>(&self, build: B) -> FirestoreResult<Response>
    where
        B: Fn(&str) -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(401, body));
        }

        debug!("Firestore token expired, refreshing");
        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(build(&token).send().await?)
    }

    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = %operation,
            collection = %collection,
            doc_id = doc_id.unwrap_or("")
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        match (status, retry_after) {
            (StatusCode::TOO_MANY_REQUESTS, Some(secs)) => FirestoreError::RateLimited(secs * 1000),
            _ => FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
