//! Liveness and readiness endpoints.

use std::future::Future;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use hookcut_models::ProjectId;

use crate::state::AppState;

/// `GET /health`, `GET /healthz`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "hookcut-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Outcome of calling one backend.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Check {
    Ok { latency_ms: u64 },
    /// The backend is not in use in this deployment.
    Skipped,
    Error { error: String },
}

impl Check {
    async fn measure<T, E: std::fmt::Display>(call: impl Future<Output = Result<T, E>>) -> Self {
        let start = Instant::now();
        match call.await {
            Ok(_) => Check::Ok {
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => Check::Error {
                error: e.to_string(),
            },
        }
    }

    fn is_failing(&self) -> bool {
        matches!(self, Check::Error { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub redis: Check,
    pub store: Check,
    pub objects: Check,
}

/// `GET /ready`
///
/// 503 when any backend the API writes to cannot be reached.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let redis = match &state.redis {
        Some(bus) => Check::measure(bus.ping()).await,
        None => Check::Skipped,
    };
    // A missing document still proves the store answers.
    let store = Check::measure(state.store.get_project(&ProjectId::from("_health"))).await;
    let objects = Check::measure(state.objects.list_objects_by_prefix("_health/")).await;

    let failing = redis.is_failing() || store.is_failing() || objects.is_failing();
    let (code, status) = if failing {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "ready")
    };
    (
        code,
        Json(Readiness {
            status,
            redis,
            store,
            objects,
        }),
    )
}
