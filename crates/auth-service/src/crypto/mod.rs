use crate::config::{
    SigningAlgorithm, SigningKeyMaterial, MAX_BCRYPT_COST, MIN_BCRYPT_COST, MIN_HMAC_KEY_BYTES,
};
use crate::errors::TokenError;
use crate::observability::metrics::{record_bcrypt_duration, record_token_validation};
use base64::{engine::general_purpose, Engine as _};
use common::jwt::{check_shape, peek_algorithm};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use ring::{
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::instrument;

/// Size of a refresh secret before encoding (256 bits).
pub const REFRESH_SECRET_BYTES: usize = 32;

/// Access token claims.
///
/// `extra` is an ordered map so the serialized payload, and therefore the
/// signature, is a pure function of the claim values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Caller-supplied string claims
    #[serde(
        rename = "custom_claims",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra: BTreeMap<String, String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Whether [`Signer::verify`] checks the `exp` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Reject tokens whose `exp` is at or before the current time.
    Enforce,
    /// Accept expired tokens. Rotation uses this: the access token only
    /// identifies the subject, it is normally expired by then.
    Ignore,
}

/// Signs and verifies access tokens with the one configured algorithm.
pub struct Signer {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_seconds: i64,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Build a signer from configured key material.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the key is too short (HMAC) or is not
    /// a valid PKCS#8 Ed25519 document.
    pub fn new(key: &SigningKeyMaterial, access_token_ttl_seconds: i64) -> Result<Self, TokenError> {
        let (encoding_key, decoding_key) = match key {
            SigningKeyMaterial::Hmac(secret) => {
                let bytes = secret.expose_secret();
                if bytes.len() < MIN_HMAC_KEY_BYTES {
                    return Err(TokenError::Signing(format!(
                        "HMAC key must be at least {} bytes",
                        MIN_HMAC_KEY_BYTES
                    )));
                }
                (
                    EncodingKey::from_secret(bytes),
                    DecodingKey::from_secret(bytes),
                )
            }
            SigningKeyMaterial::Ed25519 { private_key_pkcs8 } => {
                let pkcs8 = private_key_pkcs8.expose_secret();
                let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8)
                    .map_err(|e| TokenError::Signing(format!("Invalid private key format: {}", e)))?;
                (
                    EncodingKey::from_ed_der(pkcs8),
                    DecodingKey::from_ed_der(key_pair.public_key().as_ref()),
                )
            }
        };

        Ok(Signer {
            algorithm: key.algorithm(),
            encoding_key,
            decoding_key,
            access_token_ttl_seconds,
        })
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    /// Create an access token for `subject` expiring one TTL from now.
    #[instrument(skip_all)]
    pub fn create_access_token(
        &self,
        subject: &str,
        extra: &BTreeMap<String, String>,
    ) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            exp: now + self.access_token_ttl_seconds,
            iat: now,
            extra: extra.clone(),
        };
        self.sign_claims(&claims)
    }

    /// Sign an explicit claim set.
    ///
    /// Deterministic for both algorithms: the same claims and key always
    /// produce the same token.
    #[instrument(skip_all)]
    pub fn sign_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        let mut header = Header::new(self.algorithm.to_jwt_algorithm());
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(format!("JWT signing operation failed: {}", e)))
    }

    /// Verify signature, algorithm and (optionally) expiry.
    ///
    /// The size and shape checks run before any parsing. Only the configured
    /// algorithm is accepted; the token header never selects the key.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str, expiry: ExpiryPolicy) -> Result<Claims, TokenError> {
        if check_shape(token).is_err() {
            record_token_validation("error", Some("authentication"));
            return Err(TokenError::MalformedToken);
        }

        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        // Expiry is checked below so the boundary is exact and leeway-free.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            let mapped = match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidKeyFormat => TokenError::SignatureMismatch,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::MalformedToken,
            };
            tracing::debug!(
                target: "crypto",
                error = %e,
                presented_alg = peek_algorithm(token).as_deref().unwrap_or("unknown"),
                expected_alg = self.algorithm.as_str(),
                "Token verification failed"
            );
            record_token_validation("error", Some(mapped.category()));
            mapped
        })?;

        if expiry == ExpiryPolicy::Enforce {
            let now = chrono::Utc::now().timestamp();
            if now >= token_data.claims.exp {
                tracing::debug!(
                    target: "crypto",
                    exp = token_data.claims.exp,
                    now = now,
                    "Token rejected: expired"
                );
                record_token_validation("error", Some("authentication"));
                return Err(TokenError::Expired);
            }
        }

        record_token_validation("success", None);
        Ok(token_data.claims)
    }
}

/// Hash a refresh secret with bcrypt at the given cost.
///
/// Blocking; async callers run it under `spawn_blocking`.
///
/// # Errors
///
/// Returns `TokenError::Hashing` if the cost is outside
/// `MIN_BCRYPT_COST..=MAX_BCRYPT_COST` or bcrypt fails.
#[instrument(skip_all)]
pub fn hash_refresh_secret(secret: &SecretString, cost: u32) -> Result<String, TokenError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(TokenError::Hashing(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    let start = Instant::now();
    let result = bcrypt::hash(secret.expose_secret(), cost)
        .map_err(|e| TokenError::Hashing(format!("Secret hashing failed: {}", e)));
    record_bcrypt_duration("hash", start.elapsed());
    result
}

/// Check a presented refresh secret against a stored bcrypt hash.
///
/// Returns `Ok(false)` for any mismatch. Comparison of the derived hash is
/// constant-time. Only a structurally invalid hash is an error.
///
/// # Errors
///
/// Returns `TokenError::CorruptHash` if `hash` cannot be parsed.
#[instrument(skip_all)]
pub fn verify_refresh_secret(secret: &str, hash: &str) -> Result<bool, TokenError> {
    let start = Instant::now();
    let result = bcrypt::verify(secret, hash).map_err(|e| {
        tracing::warn!(target: "crypto", error = %e, "Stored refresh hash could not be parsed");
        TokenError::CorruptHash
    });
    record_bcrypt_duration("verify", start.elapsed());
    result
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, TokenError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| TokenError::Randomness(format!("Random bytes generation failed: {}", e)))?;
    Ok(bytes)
}

/// Generate a refresh secret (32 random bytes, standard base64).
#[instrument(skip_all)]
pub fn generate_refresh_secret() -> Result<SecretString, TokenError> {
    let bytes = generate_random_bytes(REFRESH_SECRET_BYTES)?;
    Ok(SecretString::from(general_purpose::STANDARD.encode(&bytes)))
}

/// Generate a refresh secret together with its at-rest hash.
///
/// The plaintext goes to the client once; only the hash is persisted.
#[instrument(skip_all)]
pub fn generate_refresh_credential(cost: u32) -> Result<(SecretString, String), TokenError> {
    let secret = generate_refresh_secret()?;
    let hash = hash_refresh_secret(&secret, cost)?;
    Ok((secret, hash))
}
