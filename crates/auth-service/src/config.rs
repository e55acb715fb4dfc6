use base64::{engine::general_purpose, Engine as _};
use common::secret::SecretBox;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 900;

/// Minimum access token lifetime (1 minute).
pub const MIN_ACCESS_TOKEN_TTL_SECONDS: i64 = 60;

/// Maximum access token lifetime (1 hour). Access tokens are not revocable,
/// so their lifetime stays short.
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Default refresh record lifetime (30 days).
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 3600;

/// Minimum refresh record lifetime (1 hour).
pub const MIN_REFRESH_TOKEN_TTL_SECONDS: i64 = 3600;

/// Maximum refresh record lifetime (90 days).
pub const MAX_REFRESH_TOKEN_TTL_SECONDS: i64 = 90 * 24 * 3600;

/// Default bcrypt cost factor (2^12 rounds, ~200ms per hash).
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum accepted bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum accepted bcrypt cost factor. Higher costs make every rotation
/// take close to a second.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Minimum HMAC key length in bytes (HS256 block-size security level).
pub const MIN_HMAC_KEY_BYTES: usize = 32;

/// Default deadline for a single issue/rotate call, including store I/O.
pub const DEFAULT_REQUEST_DEADLINE_MS: u64 = 5000;

/// Minimum accepted request deadline.
pub const MIN_REQUEST_DEADLINE_MS: u64 = 500;

/// Maximum accepted request deadline.
pub const MAX_REQUEST_DEADLINE_MS: u64 = 60_000;

/// Rough cost of one bcrypt run at `MIN_BCRYPT_COST`; each extra cost step
/// doubles it.
const BCRYPT_BASE_ESTIMATE_MS: u64 = 50;

/// Access token signing algorithm.
///
/// Exactly one algorithm is configured per process and it is pinned at
/// verification time; tokens carrying any other `alg` header are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// HMAC-SHA256 with a shared secret.
    Hs256,
    /// Ed25519 signatures with a PKCS#8 private key.
    EdDsa,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::EdDsa => "EdDSA",
        }
    }

    pub fn to_jwt_algorithm(self) -> jsonwebtoken::Algorithm {
        match self {
            SigningAlgorithm::Hs256 => jsonwebtoken::Algorithm::HS256,
            SigningAlgorithm::EdDsa => jsonwebtoken::Algorithm::EdDSA,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "EdDSA" => Ok(SigningAlgorithm::EdDsa),
            other => Err(ConfigError::InvalidValue(format!(
                "ACCESS_TOKEN_ALGORITHM must be HS256 or EdDSA, got {}",
                other
            ))),
        }
    }
}

/// Signing key material for access tokens.
///
/// Key bytes live in `SecretBox` so `Debug` output never contains them.
#[derive(Debug)]
pub enum SigningKeyMaterial {
    /// Shared HMAC secret (at least [`MIN_HMAC_KEY_BYTES`] bytes).
    Hmac(SecretBox<Vec<u8>>),
    /// Ed25519 private key in PKCS#8 DER.
    Ed25519 { private_key_pkcs8: SecretBox<Vec<u8>> },
}

impl SigningKeyMaterial {
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            SigningKeyMaterial::Hmac(_) => SigningAlgorithm::Hs256,
            SigningKeyMaterial::Ed25519 { .. } => SigningAlgorithm::EdDsa,
        }
    }
}

/// Immutable configuration consumed by the token lifecycle core.
///
/// Built once at start-up and shared read-only; nothing mutates it afterwards.
#[derive(Debug)]
pub struct TokenServiceConfig {
    pub signing_key: SigningKeyMaterial,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

/// Process configuration: the core's token settings plus bootstrap values.
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub request_deadline: Duration,
    #[allow(dead_code)] // Carried for an OpenTelemetry exporter; not wired yet
    pub otlp_endpoint: Option<String>,
    pub token: TokenServiceConfig,
}

// The database URL may embed a password, so it is left out of Debug output.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("request_deadline", &self.request_deadline)
            .field("otlp_endpoint", &self.otlp_endpoint)
            .field("token", &self.token)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let token = TokenServiceConfig::from_vars(vars)?;

        let deadline_ms = parse_bounded(
            vars,
            "REQUEST_DEADLINE_MS",
            DEFAULT_REQUEST_DEADLINE_MS,
            MIN_REQUEST_DEADLINE_MS,
            MAX_REQUEST_DEADLINE_MS,
        )?;

        // A rotation runs bcrypt twice before its write; leave 2x headroom.
        let required_ms = 4 * bcrypt_estimate_ms(token.bcrypt_cost);
        if deadline_ms < required_ms {
            return Err(ConfigError::InvalidValue(format!(
                "REQUEST_DEADLINE_MS={} is too short for BCRYPT_COST={} (need at least {})",
                deadline_ms, token.bcrypt_cost, required_ms
            )));
        }

        let otlp_endpoint = vars.get("OTLP_ENDPOINT").cloned();

        Ok(Config {
            database_url,
            bind_address,
            request_deadline: Duration::from_millis(deadline_ms),
            otlp_endpoint,
            token,
        })
    }
}

impl TokenServiceConfig {
    /// Load the token settings from a variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let algorithm = match vars.get("ACCESS_TOKEN_ALGORITHM") {
            Some(value) => value.parse::<SigningAlgorithm>()?,
            None => SigningAlgorithm::Hs256,
        };

        let signing_key = match algorithm {
            SigningAlgorithm::Hs256 => {
                let key = decode_key_var(vars, "ACCESS_TOKEN_SECRET_KEY")?;
                if key.len() < MIN_HMAC_KEY_BYTES {
                    return Err(ConfigError::InvalidSigningKey(format!(
                        "Expected at least {} bytes, got {}",
                        MIN_HMAC_KEY_BYTES,
                        key.len()
                    )));
                }
                SigningKeyMaterial::Hmac(SecretBox::new(Box::new(key)))
            }
            SigningAlgorithm::EdDsa => {
                let key = decode_key_var(vars, "ACCESS_TOKEN_PRIVATE_KEY")?;
                if key.is_empty() {
                    return Err(ConfigError::InvalidSigningKey(
                        "Ed25519 private key is empty".to_string(),
                    ));
                }
                SigningKeyMaterial::Ed25519 {
                    private_key_pkcs8: SecretBox::new(Box::new(key)),
                }
            }
        };

        let access_token_ttl_seconds = parse_bounded(
            vars,
            "ACCESS_TOKEN_TTL_SECONDS",
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            MIN_ACCESS_TOKEN_TTL_SECONDS,
            MAX_ACCESS_TOKEN_TTL_SECONDS,
        )?;

        let refresh_token_ttl_seconds = parse_bounded(
            vars,
            "REFRESH_TOKEN_TTL_SECONDS",
            DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            MIN_REFRESH_TOKEN_TTL_SECONDS,
            MAX_REFRESH_TOKEN_TTL_SECONDS,
        )?;

        let bcrypt_cost = parse_bounded(
            vars,
            "BCRYPT_COST",
            DEFAULT_BCRYPT_COST,
            MIN_BCRYPT_COST,
            MAX_BCRYPT_COST,
        )?;

        Ok(TokenServiceConfig {
            signing_key,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            bcrypt_cost,
        })
    }
}

fn decode_key_var(vars: &HashMap<String, String>, name: &str) -> Result<Vec<u8>, ConfigError> {
    let encoded = vars
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(ConfigError::Base64Error)
}

/// Estimated wall time of one bcrypt run at `cost`.
fn bcrypt_estimate_ms(cost: u32) -> u64 {
    BCRYPT_BASE_ESTIMATE_MS << cost.saturating_sub(MIN_BCRYPT_COST).min(MAX_BCRYPT_COST)
}

/// Parse an optional numeric variable, falling back to `default` and
/// rejecting values outside `min..=max`.
fn parse_bounded<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display + Copy,
{
    let value = match vars.get(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be a number, got {:?}", name, raw))
        })?,
        None => default,
    };

    if value < min || value > max {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }

    Ok(value)
}
