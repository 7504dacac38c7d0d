//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return a handle that renders it.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "hookcut_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "hookcut_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "hookcut_http_requests_in_flight";

    // Webhook metrics
    pub const WEBHOOKS_RECEIVED_TOTAL: &str = "hookcut_webhooks_received_total";
    pub const WEBHOOKS_REJECTED_TOTAL: &str = "hookcut_webhooks_rejected_total";
    pub const CLIPS_CREATED_TOTAL: &str = "hookcut_clips_created_total";

    // Workflow triggers
    pub const EVENTS_EMITTED_TOTAL: &str = "hookcut_events_emitted_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "hookcut_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an authenticated webhook delivery.
pub fn record_webhook_received(webhook: &str, status: &str) {
    let labels = [("webhook", webhook.to_string()), ("status", status.to_string())];
    counter!(names::WEBHOOKS_RECEIVED_TOTAL, &labels).increment(1);
}

/// Record a webhook refused before its body was read.
pub fn record_webhook_rejected(webhook: &str, reason: &str) {
    let labels = [("webhook", webhook.to_string()), ("reason", reason.to_string())];
    counter!(names::WEBHOOKS_REJECTED_TOTAL, &labels).increment(1);
}

pub fn record_clips_created(count: usize) {
    counter!(names::CLIPS_CREATED_TOTAL).increment(count as u64);
}

pub fn record_event_emitted(event: &str) {
    let labels = [("event", event.to_string())];
    counter!(names::EVENTS_EMITTED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid regex")
});

/// Label for paths that did not match a route template.
fn sanitize_path(path: &str) -> String {
    UUID_SEGMENT.replace_all(path, ":id").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| sanitize_path(request.uri().path()));
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
