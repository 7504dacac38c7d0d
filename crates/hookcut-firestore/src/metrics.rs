//! Firestore request metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "hookcut_firestore_requests_total";

    pub const RETRIES_TOTAL: &str = "hookcut_firestore_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "hookcut_firestore_latency_seconds";

    /// Transactions by outcome (`committed`, `rolled_back`).
    pub const TRANSACTIONS_TOTAL: &str = "hookcut_firestore_transactions_total";
}

pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "operation" => operation.to_string())
        .record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_transaction(outcome: &'static str) {
    counter!(names::TRANSACTIONS_TOTAL, "outcome" => outcome).increment(1);
}
