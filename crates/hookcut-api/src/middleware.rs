//! Cross-cutting request middleware.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Health and scrape endpoints, never logged.
const UNLOGGED_PATHS: [&str; 4] = ["/health", "/healthz", "/ready", "/metrics"];

/// Past this many tracked clients, idle entries are pruned.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Per-client request quota for the `/api` routes.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl ClientRateLimiter {
    pub fn per_second(requests: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// True when `client` is within its quota.
    pub fn check(&self, client: IpAddr) -> bool {
        if self.limiter.len() > MAX_TRACKED_CLIENTS {
            self.limiter.retain_recent();
        }
        self.limiter.check_key(&client).is_ok()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    match client_ip(&request) {
        Some(ip) if !limiter.check(ip) => {
            warn!(ip = %ip, path = request.uri().path(), "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            ([(header::RETRY_AFTER, "1")], ApiError::RateLimited).into_response()
        }
        _ => next.run(request).await,
    }
}

/// The original client: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the socket peer.
fn client_ip(request: &Request<Body>) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    };

    header_ip("x-forwarded-for")
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().max_age(Duration::from_secs(600));
    if origins.iter().any(|o| o == "*") {
        return layer
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Credentialed CORS needs explicit origins and headers.
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([REQUEST_ID])
        .allow_credentials(true)
}

pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    const HEADERS: [(&str, &str); 5] = [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("strict-transport-security", "max-age=31536000; includeSubDomains"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("cross-origin-resource-policy", "same-origin"),
    ];

    let mut response = next.run(request).await;
    for (name, value) in HEADERS {
        response
            .headers_mut()
            .insert(name, HeaderValue::from_static(value));
    }
    response
}

/// Reuse the caller's `X-Request-ID` when sane, otherwise mint one, and
/// echo it on the response.
pub async fn request_id(request: Request<Body>, next: Next) -> Response<Body> {
    let id = request
        .headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", id.as_str());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    if !UNLOGGED_PATHS.contains(&path.as_str()) {
        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn request_from(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/projects/p1")
            .header("X-Forwarded-For", format!("{ip}, 10.0.0.1"))
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_client_ip_prefers_forwarded() {
        let ip = client_ip(&request_from("203.0.113.7")).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());

        let request = Request::builder()
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), Some("198.51.100.2".parse().unwrap()));

        let anonymous = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&anonymous), None);
    }

    #[tokio::test]
    async fn test_rate_limit_per_client() {
        let limiter = Arc::new(ClientRateLimiter::per_second(1));
        let app = Router::new()
            .route("/api/projects/p1", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));

        let first = app.clone().oneshot(request_from("203.0.113.7")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.clone().oneshot(request_from("203.0.113.7")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()[header::RETRY_AFTER], "1");
        let other = app.oneshot(request_from("203.0.113.8")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_echoed_or_generated() {
        let app = Router::new()
            .route("/x", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_id));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/x")
                    .header("X-Request-ID", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["X-Request-ID"], "abc-123");

        let response = app
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = response.headers()["X-Request-ID"].to_str().unwrap();
        assert!(Uuid::parse_str(generated).is_ok());
    }
}
