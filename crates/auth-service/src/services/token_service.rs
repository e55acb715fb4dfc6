//! Token lifecycle: issuing and rotating token pairs.
//!
//! A user's refresh credential moves `NONE -> ACTIVE -> ACTIVE' -> ...`.
//! `issue` creates or overwrites the record; each successful `rotate`
//! replaces the stored hash, so every refresh secret is good for one
//! rotation only.
//!
//! Both operations run in two stages. The first (token checks, lookup,
//! bcrypt, new material) touches nothing durable and may be abandoned when a
//! deadline passes. The second is the single store write; once started it
//! runs to completion on its own task, so the caller either receives the
//! pair that was stored or the old credential is still the current one.

use crate::config::TokenServiceConfig;
use crate::crypto::{self, ExpiryPolicy, Signer};
use crate::errors::TokenError;
use crate::models::{RefreshRecord, TokenPair};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_rotation_conflict, record_token_issuance};
use crate::repositories::{CredentialStore, StoreError};
use chrono::Utc;
use common::secret::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Orchestrates the signer, the secret generator and the credential store.
///
/// Holds no mutable state; all per-user state lives in the store.
pub struct TokenService {
    signer: Signer,
    store: Arc<dyn CredentialStore>,
    bcrypt_cost: u32,
    refresh_token_ttl: chrono::Duration,
    // Verified against when the store has no record, so a miss costs the
    // same as a mismatch.
    dummy_hash: String,
}

/// New material for a user, generated but not yet stored.
struct PreparedPair {
    access_token: String,
    refresh_token: SecretString,
    record: RefreshRecord,
}

/// A verified rotation waiting for its compare-and-swap.
struct PreparedRotation {
    pair: PreparedPair,
    expected_hash: String,
}

impl TokenService {
    /// Build the service from immutable configuration.
    ///
    /// Blocks for one bcrypt hash at the configured cost.
    pub fn new(
        config: &TokenServiceConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, TokenError> {
        let signer = Signer::new(&config.signing_key, config.access_token_ttl_seconds)?;
        let (_, dummy_hash) = crypto::generate_refresh_credential(config.bcrypt_cost)?;

        Ok(TokenService {
            signer,
            store,
            bcrypt_cost: config.bcrypt_cost,
            refresh_token_ttl: chrono::Duration::seconds(config.refresh_token_ttl_seconds),
            dummy_hash,
        })
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Issue a fresh token pair for `user_id`, replacing any existing
    /// refresh credential.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` if `user_id` is empty
    /// - `Signing`, `Randomness`, `Hashing` for local crypto failures
    /// - `Persistence` if the hash could not be saved; no pair is returned
    pub async fn issue(
        &self,
        user_id: &str,
        extra_claims: &BTreeMap<String, String>,
    ) -> Result<TokenPair, TokenError> {
        self.issue_bounded(None, user_id, extra_claims).await
    }

    /// Exchange a (possibly expired) access token and the current refresh
    /// secret for a new pair.
    ///
    /// The subject is taken from the access token after its signature and
    /// algorithm are verified; expiry is not checked. The stored hash for that
    /// subject is then looked up and compared against the presented secret.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` if either input is empty
    /// - `InvalidAccessToken` if the access token fails signature/algorithm checks
    /// - `NoSuchRecord` if the subject has no stored credential
    /// - `InvalidRefreshToken` on secret mismatch, expired record, or a lost
    ///   race against a concurrent rotation
    /// - `Persistence` on store failure; the old secret stays valid
    pub async fn rotate(
        &self,
        access_token: &str,
        refresh_secret: &SecretString,
    ) -> Result<TokenPair, TokenError> {
        self.rotate_bounded(None, access_token, refresh_secret).await
    }

    /// [`issue`](Self::issue) with `deadline` applied to the work before
    /// the store write.
    pub async fn issue_within(
        &self,
        deadline: Duration,
        user_id: &str,
        extra_claims: &BTreeMap<String, String>,
    ) -> Result<TokenPair, TokenError> {
        self.issue_bounded(Some(deadline), user_id, extra_claims)
            .await
    }

    /// [`rotate`](Self::rotate) with `deadline` applied to the work before
    /// the compare-and-swap.
    ///
    /// `DeadlineExceeded` is only returned while nothing has been written, so
    /// the presented secret is still valid for a retry.
    pub async fn rotate_within(
        &self,
        deadline: Duration,
        access_token: &str,
        refresh_secret: &SecretString,
    ) -> Result<TokenPair, TokenError> {
        self.rotate_bounded(Some(deadline), access_token, refresh_secret)
            .await
    }

    #[instrument(skip_all, fields(user = %hash_for_correlation(user_id)))]
    async fn issue_bounded(
        &self,
        deadline: Option<Duration>,
        user_id: &str,
        extra_claims: &BTreeMap<String, String>,
    ) -> Result<TokenPair, TokenError> {
        let start = Instant::now();
        let result = async {
            let prepared =
                before_deadline("issue", deadline, self.prepare_issue(user_id, extra_claims))
                    .await?;
            self.commit_issue(prepared).await
        }
        .await;
        record_outcome("issue", &result, start);
        result
    }

    #[instrument(skip_all)]
    async fn rotate_bounded(
        &self,
        deadline: Option<Duration>,
        access_token: &str,
        refresh_secret: &SecretString,
    ) -> Result<TokenPair, TokenError> {
        let start = Instant::now();
        let result = async {
            let prepared = before_deadline(
                "rotate",
                deadline,
                self.prepare_rotation(access_token, refresh_secret),
            )
            .await?;
            self.commit_rotation(prepared).await
        }
        .await;
        record_outcome("rotate", &result, start);
        result
    }

    async fn prepare_issue(
        &self,
        user_id: &str,
        extra_claims: &BTreeMap<String, String>,
    ) -> Result<PreparedPair, TokenError> {
        if user_id.is_empty() {
            return Err(TokenError::MissingCredentials);
        }

        self.new_pair(user_id, extra_claims).await
    }

    async fn commit_issue(&self, prepared: PreparedPair) -> Result<TokenPair, TokenError> {
        let PreparedPair {
            access_token,
            refresh_token,
            record,
        } = prepared;

        let store = Arc::clone(&self.store);
        run_to_completion(async move { store.save_refresh_hash(&record).await })
            .await
            .inspect_err(|e| {
                tracing::warn!(target: "auth.token_service", error = %e, "Failed to save refresh credential");
            })?;

        tracing::info!(target: "auth.token_service", "Token pair issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.signer.access_token_ttl_seconds(),
        })
    }

    async fn prepare_rotation(
        &self,
        access_token: &str,
        refresh_secret: &SecretString,
    ) -> Result<PreparedRotation, TokenError> {
        if access_token.is_empty() || refresh_secret.expose_secret().is_empty() {
            return Err(TokenError::MissingCredentials);
        }

        let claims = self
            .signer
            .verify(access_token, ExpiryPolicy::Ignore)
            .map_err(|e| {
                tracing::debug!(target: "auth.token_service", error = %e, "Rotation rejected: access token");
                TokenError::InvalidAccessToken
            })?;

        let user = hash_for_correlation(&claims.sub);

        let record = match self.store.get_refresh_hash(&claims.sub).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => {
                // Result ignored: this only equalizes timing with the mismatch path
                let _ = self
                    .verify_refresh_secret(refresh_secret, self.dummy_hash.clone())
                    .await;
                tracing::debug!(target: "auth.token_service", user = %user, "Rotation rejected: no record");
                return Err(TokenError::NoSuchRecord);
            }
            Err(e) => {
                tracing::warn!(target: "auth.token_service", user = %user, error = %e, "Refresh credential lookup failed");
                return Err(e.into());
            }
        };

        let matches = self
            .verify_refresh_secret(refresh_secret, record.refresh_hash.clone())
            .await?;
        if !matches {
            tracing::debug!(target: "auth.token_service", user = %user, "Rotation rejected: refresh secret mismatch");
            return Err(TokenError::InvalidRefreshToken);
        }

        if record.is_expired_at(Utc::now()) {
            tracing::debug!(target: "auth.token_service", user = %user, "Rotation rejected: refresh credential expired");
            return Err(TokenError::InvalidRefreshToken);
        }

        Ok(PreparedRotation {
            pair: self.new_pair(&claims.sub, &claims.extra).await?,
            expected_hash: record.refresh_hash,
        })
    }

    async fn commit_rotation(&self, prepared: PreparedRotation) -> Result<TokenPair, TokenError> {
        let PreparedRotation {
            pair:
                PreparedPair {
                    access_token,
                    refresh_token,
                    record,
                },
            expected_hash,
        } = prepared;
        let user = hash_for_correlation(&record.user_id);

        let store = Arc::clone(&self.store);
        let replaced = run_to_completion(async move {
            store.replace_refresh_hash(&expected_hash, &record).await
        })
        .await
        .inspect_err(|e| {
            tracing::warn!(target: "auth.token_service", user = %user, error = %e, "Failed to persist rotated credential");
        })?;

        if !replaced {
            // Another rotation consumed the same secret first. The material
            // generated here was never stored and is dropped.
            record_rotation_conflict();
            tracing::warn!(target: "auth.token_service", user = %user, "Rotation lost a concurrent race");
            return Err(TokenError::InvalidRefreshToken);
        }

        tracing::info!(target: "auth.token_service", user = %user, "Token pair rotated");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.signer.access_token_ttl_seconds(),
        })
    }

    async fn new_pair(
        &self,
        user_id: &str,
        extra_claims: &BTreeMap<String, String>,
    ) -> Result<PreparedPair, TokenError> {
        let access_token = self.signer.create_access_token(user_id, extra_claims)?;
        let (refresh_token, refresh_hash) = self.generate_refresh_credential().await?;

        let now = Utc::now();
        Ok(PreparedPair {
            access_token,
            refresh_token,
            record: RefreshRecord {
                user_id: user_id.to_string(),
                refresh_hash,
                created_at: now,
                expires_at: now + self.refresh_token_ttl,
            },
        })
    }

    async fn generate_refresh_credential(&self) -> Result<(SecretString, String), TokenError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || crypto::generate_refresh_credential(cost))
            .await
            .map_err(|e| TokenError::Hashing(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_refresh_secret(
        &self,
        secret: &SecretString,
        hash: String,
    ) -> Result<bool, TokenError> {
        let secret = SecretString::from(secret.expose_secret().to_owned());
        tokio::task::spawn_blocking(move || {
            crypto::verify_refresh_secret(secret.expose_secret(), &hash)
        })
        .await
        .map_err(|e| TokenError::Hashing(format!("Verification task failed: {}", e)))?
    }
}

/// Run the side-effect-free stage of an operation, bounded by `deadline`.
///
/// Also fails if the deadline has passed by the time the stage finishes, so a
/// store write never starts late.
async fn before_deadline<T>(
    operation: &str,
    deadline: Option<Duration>,
    stage: impl Future<Output = Result<T, TokenError>>,
) -> Result<T, TokenError> {
    let Some(deadline) = deadline else {
        return stage.await;
    };

    let expires_at = tokio::time::Instant::now() + deadline;
    let output = tokio::time::timeout_at(expires_at, stage)
        .await
        .map_err(|_| deadline_exceeded(operation, deadline))??;

    if tokio::time::Instant::now() >= expires_at {
        return Err(deadline_exceeded(operation, deadline));
    }
    Ok(output)
}

/// Run a store write on its own task so dropping the caller cannot abandon
/// it half way. The write is bounded by the store's own timeouts.
async fn run_to_completion<T, F>(write: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    tokio::spawn(write)
        .await
        .map_err(|e| StoreError::Backend(format!("Store task failed: {}", e)))?
}

fn record_outcome(operation: &str, result: &Result<TokenPair, TokenError>, start: Instant) {
    let status = if result.is_ok() { "success" } else { "error" };
    record_token_issuance(operation, status, start.elapsed());
}

fn deadline_exceeded(operation: &str, deadline: Duration) -> TokenError {
    tracing::warn!(
        target: "auth.token_service",
        operation = operation,
        deadline_ms = deadline.as_millis() as u64,
        "Operation exceeded its deadline"
    );
    TokenError::DeadlineExceeded
}
