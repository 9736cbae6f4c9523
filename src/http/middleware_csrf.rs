//! Anti-forgery protection for mutating admin requests.
//!
//! Tokens are stateless: `base64url(issued_at || nonce || HMAC-SHA256(key, issued_at || nonce))`
//! where `issued_at` is big-endian unix seconds. Any holder of the server key
//! can verify a token without a session lookup, and tokens older than the
//! configured lifetime are rejected.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use base64::prelude::*;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::time::Duration;

use crate::config::CSRF_KEY_MIN_LENGTH;
use crate::errors::{AdminError, ConfigError};
use crate::http::context::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the anti-forgery token
pub const CSRF_HEADER: &str = "x-csrf-token";

const TIMESTAMP_LENGTH: usize = 8;
const NONCE_LENGTH: usize = 32;
const MAC_LENGTH: usize = 32;
const TOKEN_LENGTH: usize = TIMESTAMP_LENGTH + NONCE_LENGTH + MAC_LENGTH;

/// Tokens stamped this far ahead of the local clock are still accepted
const MAX_CLOCK_SKEW_SECONDS: i64 = 60;

/// Issues and checks anti-forgery tokens
pub trait AntiForgeryVerifier: Send + Sync {
    /// Issue a fresh token
    fn issue(&self) -> String;

    /// Whether `token` was issued by this verifier and is still fresh
    fn verify(&self, token: &str) -> bool;
}

/// HMAC-signed, time-limited anti-forgery tokens
pub struct CsrfTokenManager {
    mac: HmacSha256,
    max_age_seconds: i64,
}

impl CsrfTokenManager {
    pub fn new(key: &[u8], ttl: Duration) -> Result<Self, ConfigError> {
        if key.len() < CSRF_KEY_MIN_LENGTH {
            return Err(ConfigError::CsrfKeyTooShort(CSRF_KEY_MIN_LENGTH));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|_| ConfigError::CsrfKeyTooShort(CSRF_KEY_MIN_LENGTH))?;

        Ok(Self {
            mac,
            max_age_seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        })
    }

    /// Manager with a random per-process key
    pub fn ephemeral(ttl: Duration) -> Result<Self, ConfigError> {
        let key: [u8; 32] = OsRng.r#gen();
        Self::new(&key, ttl)
    }

    fn keyed(&self, issued_at: &[u8], nonce: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(issued_at);
        mac.update(nonce);
        mac
    }

    /// Issue a token stamped with `now`
    pub fn issue_at(&self, now: DateTime<Utc>) -> String {
        let issued_at = now.timestamp().to_be_bytes();
        let nonce: [u8; NONCE_LENGTH] = OsRng.r#gen();
        let tag = self.keyed(&issued_at, &nonce).finalize().into_bytes();

        let mut token = Vec::with_capacity(TOKEN_LENGTH);
        token.extend_from_slice(&issued_at);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&tag);
        BASE64_URL_SAFE_NO_PAD.encode(token)
    }

    /// Check the signature first, then the token age relative to `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let Ok(decoded) = BASE64_URL_SAFE_NO_PAD.decode(token.trim()) else {
            return false;
        };
        if decoded.len() != TOKEN_LENGTH {
            return false;
        }
        let (issued_at, rest) = decoded.split_at(TIMESTAMP_LENGTH);
        let (nonce, tag) = rest.split_at(NONCE_LENGTH);

        if self.keyed(issued_at, nonce).verify_slice(tag).is_err() {
            return false;
        }

        let Ok(issued_at) = <[u8; TIMESTAMP_LENGTH]>::try_from(issued_at) else {
            return false;
        };
        let age = now.timestamp().saturating_sub(i64::from_be_bytes(issued_at));
        (-MAX_CLOCK_SKEW_SECONDS..=self.max_age_seconds).contains(&age)
    }
}

impl AntiForgeryVerifier for CsrfTokenManager {
    fn issue(&self) -> String {
        self.issue_at(Utc::now())
    }

    fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now())
    }
}

/// Only state-changing methods need a token
pub fn requires_csrf_validation(method: &Method) -> bool {
    matches!(
        method,
        &Method::POST | &Method::PUT | &Method::DELETE | &Method::PATCH
    )
}

/// Reject mutating requests without a valid token before any handler runs
pub async fn require_csrf_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    if !state.csrf_enforced || !requires_csrf_validation(request.method()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    match token {
        None => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "CSRF token missing for state-changing request"
            );
            Err(AdminError::Authorization(
                "CSRF token required for this operation".to_string(),
            ))
        }
        Some(token) if !state.csrf_verifier.verify(token) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "CSRF token validation failed"
            );
            Err(AdminError::Authorization("Invalid CSRF token".to_string()))
        }
        Some(_) => Ok(next.run(request).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
    const HOUR: Duration = Duration::from_secs(3600);

    fn manager() -> CsrfTokenManager {
        CsrfTokenManager::new(KEY, HOUR).unwrap()
    }

    #[test]
    fn test_issued_tokens_verify() {
        let manager = manager();
        let token = manager.issue();
        assert!(manager.verify(&token));
        assert_ne!(token, manager.issue());
    }

    #[test]
    fn test_short_key_rejected() {
        let err = CsrfTokenManager::new(b"short", HOUR).err().unwrap();
        assert!(matches!(err, ConfigError::CsrfKeyTooShort(_)));
        assert!(CsrfTokenManager::ephemeral(HOUR).is_ok());
    }

    #[test]
    fn test_rejects_foreign_and_malformed_tokens() {
        let manager = manager();
        let other = CsrfTokenManager::new(b"fedcba9876543210fedcba9876543210", HOUR).unwrap();

        assert!(!manager.verify(&other.issue()));
        assert!(!manager.verify(""));
        assert!(!manager.verify("not base64 !!"));
        assert!(!manager.verify(&BASE64_URL_SAFE_NO_PAD.encode([0u8; 16])));

        // Flip a bit in the nonce and in the tag
        for index in [TIMESTAMP_LENGTH, TOKEN_LENGTH - 1] {
            let mut tampered = BASE64_URL_SAFE_NO_PAD.decode(manager.issue()).unwrap();
            tampered[index] ^= 0xff;
            assert!(!manager.verify(&BASE64_URL_SAFE_NO_PAD.encode(tampered)));
        }
    }

    #[test]
    fn test_tokens_expire() {
        let manager = manager();
        let now = Utc::now();

        let fresh = manager.issue_at(now - chrono::Duration::minutes(59));
        assert!(manager.verify_at(&fresh, now));

        let stale = manager.issue_at(now - chrono::Duration::minutes(61));
        assert!(!manager.verify_at(&stale, now));

        let skewed = manager.issue_at(now + chrono::Duration::seconds(30));
        assert!(manager.verify_at(&skewed, now));

        let future = manager.issue_at(now + chrono::Duration::minutes(10));
        assert!(!manager.verify_at(&future, now));
    }

    #[test]
    fn test_rewritten_timestamp_rejected() {
        let manager = manager();
        let now = Utc::now();
        let stale = manager.issue_at(now - chrono::Duration::hours(2));

        // Moving the stamp forward invalidates the signature
        let mut forged = BASE64_URL_SAFE_NO_PAD.decode(stale).unwrap();
        forged[..TIMESTAMP_LENGTH].copy_from_slice(&now.timestamp().to_be_bytes());
        assert!(!manager.verify_at(&BASE64_URL_SAFE_NO_PAD.encode(forged), now));
    }

    #[test]
    fn test_safe_methods_skip_validation() {
        assert!(!requires_csrf_validation(&Method::GET));
        assert!(!requires_csrf_validation(&Method::OPTIONS));
        assert!(requires_csrf_validation(&Method::POST));
        assert!(requires_csrf_validation(&Method::DELETE));
    }
}
