//! Builder patterns for test data construction
//!
//! Builds access tokens with arbitrary claims (expired, far-future, custom
//! subject) signed by a real `Signer`.

use auth_service::crypto::{Claims, Signer};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

/// Builder for creating test access tokens
///
/// # Example
/// ```rust,ignore
/// let expired = TestTokenBuilder::new()
///     .for_user("alice")
///     .expires_in(-60)
///     .sign_with(service.signer())?;
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    sub: String,
    exp: i64,
    iat: i64,
    extra: BTreeMap<String, String>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            exp: (now + Duration::seconds(900)).timestamp(),
            iat: now.timestamp(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Add a custom claim
    pub fn with_claim(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    /// Build the claims without signing
    pub fn build(self) -> Claims {
        Claims {
            sub: self.sub,
            exp: self.exp,
            iat: self.iat,
            extra: self.extra,
        }
    }

    /// Sign the claims with `signer`
    pub fn sign_with(self, signer: &Signer) -> Result<String, anyhow::Error> {
        Ok(signer.sign_claims(&self.build())?)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
