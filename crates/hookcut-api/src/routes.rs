//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_project, create_upload_url, delete_project, get_clip_edit, get_clip_status,
    get_project, health, processing_webhook, ready, render_webhook, save_clip_edit,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    ClientRateLimiter,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let project_routes = Router::new()
        .route("/projects", post(create_project))
        .route("/projects/upload-url", post(create_upload_url))
        .route("/projects/:project_id", get(get_project).delete(delete_project));

    let clip_routes = Router::new()
        .route("/clips/:clip_id/edit", get(get_clip_edit).post(save_clip_edit))
        .route("/clips/:clip_id/status", get(get_clip_status));

    let rate_limiter = Arc::new(ClientRateLimiter::per_second(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(project_routes)
        .merge(clip_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    // Service-to-service; authenticated by shared secret, not rate limited.
    let webhook_routes = Router::new()
        .route("/webhooks/modal", post(processing_webhook))
        .route("/webhooks/video-generated", post(render_webhook));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
