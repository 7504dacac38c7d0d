//! Session token authentication.
//!
//! The web app issues HS256 session JWTs; the API only verifies them.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use hookcut_models::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Decoded session claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Expiration
    pub exp: i64,
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl From<SessionClaims> for AuthUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: UserId::from(claims.sub),
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Verify a session token against `secret`.
pub fn verify_session(token: &str, secret: &str) -> Result<SessionClaims, ApiError> {
    if secret.is_empty() {
        return Err(ApiError::NotConfigured("session secret is not set".into()));
    }
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

    if data.claims.sub.trim().is_empty() {
        return Err(ApiError::unauthorized("Token has no subject"));
    }
    Ok(data.claims)
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = verify_session(token, &state.config.session_secret)?;
        Ok(AuthUser::from(claims))
    }
}
