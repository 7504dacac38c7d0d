//! Authentication for inbound service webhooks.
//!
//! Both webhook endpoints share one primitive with their own secret. A caller
//! proves knowledge of the secret either by sending it as a bearer token or by
//! signing the raw body:
//!
//! ```text
//! Authorization: Bearer <secret>
//! X-Hookcut-Signature: sha256=<hex hmac-sha256(secret, body)>
//! ```
//!
//! Verification runs before the body is parsed. A missing secret rejects every
//! request.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hookcut-Signature";

#[derive(Clone)]
pub struct WebhookVerifier {
    name: &'static str,
    secret: Option<String>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("name", &self.name)
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(name: &'static str, secret: Option<String>) -> Self {
        Self { name, secret }
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> ApiResult<()> {
        let Some(secret) = self.secret.as_deref() else {
            error!(webhook = self.name, "Webhook secret is not configured, rejecting request");
            metrics::record_webhook_rejected(self.name, "unconfigured");
            return Err(ApiError::NotConfigured(format!(
                "{} webhook secret is not configured",
                self.name
            )));
        };

        let verified = if let Some(signature) = header_str(headers, SIGNATURE_HEADER) {
            verify_signature(secret, signature, body)?
        } else if let Some(token) = header_str(headers, "Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            tokens_match(secret, token.trim())?
        } else {
            false
        };

        if !verified {
            warn!(webhook = self.name, "Webhook authentication failed");
            metrics::record_webhook_rejected(self.name, "unauthorized");
            return Err(ApiError::unauthorized("Invalid webhook credentials"));
        }
        Ok(())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn mac(secret: &str) -> ApiResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::internal(format!("Invalid HMAC key: {}", e)))
}

fn verify_signature(secret: &str, header: &str, body: &[u8]) -> ApiResult<bool> {
    let Some(hex_sig) = header.trim().strip_prefix("sha256=") else {
        return Ok(false);
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return Ok(false);
    };
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(mac.verify_slice(&expected).is_ok())
}

/// Compare digests of both tokens so the comparison time does not depend on
/// where they differ.
fn tokens_match(secret: &str, presented: &str) -> ApiResult<bool> {
    let mut expected = mac(secret)?;
    expected.update(secret.as_bytes());
    let expected = expected.finalize().into_bytes();

    let mut actual = mac(secret)?;
    actual.update(presented.as_bytes());
    Ok(actual.verify_slice(&expected).is_ok())
}

/// `sha256=<hex>` signature of `body`, as a sender would compute it.
pub fn sign_body(secret: &str, body: &[u8]) -> ApiResult<String> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_unconfigured_rejects_everything() {
        let verifier = WebhookVerifier::new("modal", None);
        let err = verifier
            .verify(&headers("Authorization", "Bearer anything"), b"{}")
            .unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured(_)));
    }

    #[test]
    fn test_bearer_token() {
        let verifier = WebhookVerifier::new("modal", Some("s3cret".into()));
        assert!(verifier
            .verify(&headers("Authorization", "Bearer s3cret"), b"{}")
            .is_ok());
        assert!(matches!(
            verifier.verify(&headers("Authorization", "Bearer s3cre"), b"{}"),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            verifier.verify(&headers("Authorization", "s3cret"), b"{}"),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            verifier.verify(&HeaderMap::new(), b"{}"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_body_signature() {
        let verifier = WebhookVerifier::new("video-generated", Some("k".into()));
        let body = br#"{"success":true,"clipId":"c1"}"#;
        let signature = sign_body("k", body).unwrap();

        assert!(verifier
            .verify(&headers(SIGNATURE_HEADER, &signature), body)
            .is_ok());
        // Tampered body.
        assert!(verifier
            .verify(&headers(SIGNATURE_HEADER, &signature), b"{}")
            .is_err());
        assert!(verifier
            .verify(&headers(SIGNATURE_HEADER, "sha256=zz"), body)
            .is_err());
        assert!(verifier
            .verify(&headers(SIGNATURE_HEADER, "md5=00"), body)
            .is_err());
    }
}
