use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;

/// Result of a successful issue or rotation.
///
/// The refresh secret is plaintext here and nowhere else; it is returned to
/// the caller exactly once and never persisted.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: SecretString,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Refresh credential model (maps to refresh_credentials table)
#[derive(Clone, FromRow)]
pub struct RefreshRecord {
    pub user_id: String,
    pub refresh_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for RefreshRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRecord")
            .field("user_id", &self.user_id)
            .field("refresh_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of `POST /api/v1/token`.
#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub user_id: String,
    #[serde(default)]
    pub custom_claims: BTreeMap<String, String>,
}

/// Body of `POST /api/v1/token/refresh` (JSON or form encoded).
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
}

/// Token response (OAuth 2.0 shaped)
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        TokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token.expose_secret().to_string(),
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

/// Readiness probe response body.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub credential_store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}
