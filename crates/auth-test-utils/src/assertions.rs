//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for access tokens. The payload is decoded
//! without verifying the signature; use `Signer::verify` for that.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::collections::BTreeMap;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub custom_claims: BTreeMap<String, String>,
}

fn decode_part<T: for<'de> Deserialize<'de>>(token: &str, index: usize) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing part {}", index));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT part {}: {}", index, e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT part {} JSON: {}", index, e))
}

/// Custom assertions for access tokens
///
/// # Example
/// ```rust,ignore
/// pair.access_token
///     .assert_valid_jwt("EdDSA")
///     .assert_for_subject("alice")
///     .assert_has_claim("role", "admin");
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a three-part JWT signed with `alg`
    fn assert_valid_jwt(&self, alg: &str) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that `exp - iat` equals the specified seconds
    fn assert_lifetime(&self, seconds: i64) -> &Self;

    /// Assert that the token carries the custom claim `key = value`
    fn assert_has_claim(&self, key: &str, value: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self, alg: &str) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "JWT must have 3 parts (header.payload.signature)"
        );

        let header: JwtHeader = decode_part(self, 0);
        assert_eq!(header.alg, alg, "Unexpected JWT algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        let claims: JwtClaims = decode_part(self, 1);
        assert!(!claims.sub.is_empty(), "JWT subject must not be empty");
        assert!(claims.exp > claims.iat, "JWT must expire after it is issued");

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1);
        assert_eq!(claims.sub, subject, "JWT subject mismatch");
        self
    }

    fn assert_lifetime(&self, seconds: i64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1);
        assert_eq!(claims.exp - claims.iat, seconds, "JWT lifetime mismatch");
        self
    }

    fn assert_has_claim(&self, key: &str, value: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1);
        assert_eq!(
            claims.custom_claims.get(key).map(String::as_str),
            Some(value),
            "JWT custom claim '{}' mismatch",
            key
        );
        self
    }
}
