//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum workflow runs executing at once
    pub max_concurrent_runs: usize,
    /// Delay between dispatch and the guardian self-check
    pub guardian_timeout: Duration,
    /// Retries of a failed run before its failure path is taken
    pub max_step_retries: u32,
    /// First retry delay; doubles on every further attempt
    pub retry_base_delay: Duration,
    /// Lifetime of a per-key concurrency lease
    pub lease_ttl: Duration,
    /// Re-delivery delay for a run that could not take its lease
    pub contention_delay: Duration,
    /// How often delayed events are promoted onto the stream
    pub scheduler_poll_interval: Duration,
    /// How often abandoned deliveries of crashed consumers are claimed
    pub claim_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Externally reachable base URL of the API, used for the processing
    /// webhook and the links in notification emails
    pub public_base_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 4,
            guardian_timeout: Duration::from_secs(45 * 60),
            max_step_retries: 2,
            retry_base_delay: Duration::from_secs(5),
            lease_ttl: Duration::from_secs(300),
            contention_delay: Duration::from_secs(10),
            scheduler_poll_interval: Duration::from_secs(1),
            claim_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            public_base_url: "http://localhost:8000".to_string(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_runs: env_or("WORKER_MAX_RUNS", defaults.max_concurrent_runs),
            guardian_timeout: Duration::from_secs(env_or(
                "WORKER_GUARDIAN_TIMEOUT_SECS",
                defaults.guardian_timeout.as_secs(),
            )),
            max_step_retries: env_or("WORKER_MAX_STEP_RETRIES", defaults.max_step_retries),
            retry_base_delay: Duration::from_secs(env_or(
                "WORKER_RETRY_BASE_DELAY_SECS",
                defaults.retry_base_delay.as_secs(),
            )),
            lease_ttl: Duration::from_secs(env_or(
                "WORKER_LEASE_TTL_SECS",
                defaults.lease_ttl.as_secs(),
            )),
            contention_delay: Duration::from_secs(env_or(
                "WORKER_CONTENTION_DELAY_SECS",
                defaults.contention_delay.as_secs(),
            )),
            scheduler_poll_interval: Duration::from_millis(env_or(
                "WORKER_SCHEDULER_POLL_MS",
                defaults.scheduler_poll_interval.as_millis() as u64,
            )),
            claim_interval: Duration::from_secs(env_or(
                "WORKER_CLAIM_INTERVAL_SECS",
                defaults.claim_interval.as_secs(),
            )),
            shutdown_timeout: Duration::from_secs(env_or(
                "WORKER_SHUTDOWN_TIMEOUT",
                defaults.shutdown_timeout.as_secs(),
            )),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.public_base_url),
        }
    }

    fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    /// Where the processing service reports results.
    pub fn processing_webhook_url(&self) -> String {
        format!("{}/webhooks/modal", self.base_url())
    }

    /// Link to a project, used in emails.
    pub fn project_url(&self, project_id: &str) -> String {
        format!("{}/projects/{}", self.base_url(), project_id)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}
