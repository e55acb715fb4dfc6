//! Test configuration builders
//!
//! Builds `TokenServiceConfig` values (and matching environment maps) with
//! the cheapest bcrypt cost so tests stay fast.

use crate::crypto_fixtures::{
    encode_key, test_ed25519_material, test_ed25519_pkcs8, test_hmac_key, test_hmac_material,
};
use crate::test_ids::TEST_BCRYPT_COST;
use auth_service::config::{
    SigningKeyMaterial, TokenServiceConfig, DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
    DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
};
use auth_service::repositories::{CredentialStore, InMemoryCredentialStore};
use auth_service::services::TokenService;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for token service configuration in tests.
///
/// # Example
/// ```rust,ignore
/// let service = TestConfigBuilder::ed25519()
///     .with_access_ttl(60)
///     .build_service(store)?;
/// ```
#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    algorithm: &'static str,
    key_seed: u8,
    access_ttl: i64,
    refresh_ttl: i64,
    bcrypt_cost: u32,
}

impl TestConfigBuilder {
    /// HS256 with the key for seed 1.
    pub fn hmac() -> Self {
        Self {
            algorithm: "HS256",
            key_seed: 1,
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_ttl: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            bcrypt_cost: TEST_BCRYPT_COST,
        }
    }

    /// EdDSA with the key for seed 1.
    pub fn ed25519() -> Self {
        Self {
            algorithm: "EdDSA",
            ..Self::hmac()
        }
    }

    pub fn with_key_seed(mut self, seed: u8) -> Self {
        self.key_seed = seed;
        self
    }

    pub fn with_access_ttl(mut self, seconds: i64) -> Self {
        self.access_ttl = seconds;
        self
    }

    pub fn with_refresh_ttl(mut self, seconds: i64) -> Self {
        self.refresh_ttl = seconds;
        self
    }

    /// Build the config directly, bypassing environment parsing.
    ///
    /// TTLs are not range-checked here, so tests can use values the
    /// environment loader would refuse.
    pub fn build(&self) -> Result<TokenServiceConfig, anyhow::Error> {
        let signing_key: SigningKeyMaterial = match self.algorithm {
            "EdDSA" => test_ed25519_material(self.key_seed)?,
            _ => test_hmac_material(self.key_seed),
        };

        Ok(TokenServiceConfig {
            signing_key,
            access_token_ttl_seconds: self.access_ttl,
            refresh_token_ttl_seconds: self.refresh_ttl,
            bcrypt_cost: self.bcrypt_cost,
        })
    }

    /// Environment variables equivalent to this builder.
    pub fn env_vars(&self) -> Result<HashMap<String, String>, anyhow::Error> {
        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/tokens_test".to_string(),
            ),
            (
                "ACCESS_TOKEN_ALGORITHM".to_string(),
                self.algorithm.to_string(),
            ),
            (
                "ACCESS_TOKEN_TTL_SECONDS".to_string(),
                self.access_ttl.to_string(),
            ),
            (
                "REFRESH_TOKEN_TTL_SECONDS".to_string(),
                self.refresh_ttl.to_string(),
            ),
            ("BCRYPT_COST".to_string(), self.bcrypt_cost.to_string()),
        ]);

        if self.algorithm == "EdDSA" {
            vars.insert(
                "ACCESS_TOKEN_PRIVATE_KEY".to_string(),
                encode_key(&test_ed25519_pkcs8(self.key_seed)?),
            );
        } else {
            vars.insert(
                "ACCESS_TOKEN_SECRET_KEY".to_string(),
                encode_key(&test_hmac_key(self.key_seed)),
            );
        }

        Ok(vars)
    }

    /// Build a `TokenService` over the given store.
    pub fn build_service(
        &self,
        store: Arc<dyn CredentialStore>,
    ) -> Result<TokenService, anyhow::Error> {
        Ok(TokenService::new(&self.build()?, store)?)
    }

    /// Build a `TokenService` over a fresh in-memory store.
    pub fn build_service_in_memory(&self) -> Result<TokenService, anyhow::Error> {
        self.build_service(Arc::new(InMemoryCredentialStore::new()))
    }
}
