//! Observability for the token lifecycle service.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field
//! allow-listing. Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (operation names, algorithms, outcomes)
//! - **HASHED**: Must be SHA-256 hashed for correlation (user_id)
//! - **NEVER**: Must never appear in logs (refresh secrets, refresh hashes,
//!   access tokens, signing keys)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// This is a one-way hash for correlation only, not a secret-protection
/// primitive.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}
