//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible HMAC keys and Ed25519 PKCS#8 documents.
//! All fixtures are deterministic based on seed values.

use auth_service::config::SigningKeyMaterial;
use base64::engine::general_purpose;
use base64::Engine;
use common::secret::SecretBox;
use ring::signature::Ed25519KeyPair;
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Deterministic 32-byte pattern derived from `seed`.
fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = seed;
    for (i, byte) in bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    bytes
}

/// Deterministic 32-byte HMAC key for HS256 tests.
///
/// Different seeds produce different keys; the same seed always produces the
/// same key.
pub fn test_hmac_key(seed: u8) -> Vec<u8> {
    seed_bytes(seed).to_vec()
}

/// Deterministic Ed25519 private key as a PKCS#8 v1 DER document.
///
/// # Example
/// ```rust,ignore
/// let pkcs8 = test_ed25519_pkcs8(1)?;
/// assert_eq!(pkcs8, test_ed25519_pkcs8(1)?);
/// ```
pub fn test_ed25519_pkcs8(seed: u8) -> Result<Vec<u8>, FixtureError> {
    let seed = seed_bytes(seed);

    // Validate the seed produces a usable keypair before wrapping it.
    Ed25519KeyPair::from_seed_unchecked(&seed)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    // PKCS#8 v1 for Ed25519 (RFC 8410):
    // SEQUENCE { INTEGER 0, SEQUENCE { OID 1.3.101.112 }, OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(&seed);

    Ok(pkcs8)
}

/// HS256 key material built from [`test_hmac_key`].
pub fn test_hmac_material(seed: u8) -> SigningKeyMaterial {
    SigningKeyMaterial::Hmac(SecretBox::new(Box::new(test_hmac_key(seed))))
}

/// EdDSA key material built from [`test_ed25519_pkcs8`].
pub fn test_ed25519_material(seed: u8) -> Result<SigningKeyMaterial, FixtureError> {
    Ok(SigningKeyMaterial::Ed25519 {
        private_key_pkcs8: SecretBox::new(Box::new(test_ed25519_pkcs8(seed)?)),
    })
}

/// Standard base64, the encoding the service expects for key variables.
pub fn encode_key(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}
