//! Credential store: persistence of refresh credential hashes, keyed by user.
//!
//! The token service depends only on [`CredentialStore`]. Two backends ship:
//! - [`PgCredentialStore`] for production (PostgreSQL via sqlx)
//! - [`InMemoryCredentialStore`] for tests and single-process deployments

pub mod memory;
pub mod refresh_credentials;

pub use memory::InMemoryCredentialStore;
pub use refresh_credentials::PgCredentialStore;

use crate::errors::TokenError;
use crate::models::RefreshRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No refresh credential for user")]
    NotFound,

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => TokenError::NoSuchRecord,
            StoreError::Backend(msg) => TokenError::Persistence(msg),
        }
    }
}

/// Per-user storage of refresh credential hashes.
///
/// Implementations must make [`replace_refresh_hash`](Self::replace_refresh_hash)
/// atomic per user: of two concurrent replacements expecting the same old
/// hash, at most one may succeed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert or overwrite the record for `record.user_id`.
    async fn save_refresh_hash(&self, record: &RefreshRecord) -> Result<(), StoreError>;

    /// Fetch the current record for a user.
    ///
    /// Returns `StoreError::NotFound` when the user has no record.
    async fn get_refresh_hash(&self, user_id: &str) -> Result<RefreshRecord, StoreError>;

    /// Replace the record only if its current hash equals `expected_hash`.
    ///
    /// Returns `Ok(false)` when the stored hash differs or the record is gone.
    async fn replace_refresh_hash(
        &self,
        expected_hash: &str,
        record: &RefreshRecord,
    ) -> Result<bool, StoreError>;

    /// Check the backend is reachable (used by the readiness probe).
    async fn ping(&self) -> Result<(), StoreError>;
}
