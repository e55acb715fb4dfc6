//! JWT pre-parse checks shared by signers and verifiers.
//!
//! These run before any cryptographic work:
//! - Size limit for denial-of-service prevention
//! - Structural shape check (three dot-separated segments)
//! - Header `alg` inspection for diagnostics
//!
//! Nothing in this module validates a signature. A token that passes these
//! checks must still be verified with the pinned algorithm and key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Access tokens issued by this system are well under 1KB even with a
/// handful of extra claims. Larger inputs are rejected before base64 decoding
/// or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Structural problems detected before signature verification.
///
/// Display text is deliberately identical for every variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtShapeError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid")]
    TokenTooLarge,

    /// Token is not `header.payload.signature` or the header is not JSON.
    #[error("The access token is invalid")]
    Malformed,
}

/// Check size and segment count of a compact JWS.
///
/// # Errors
///
/// - `TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `Malformed` if the token does not have exactly three non-empty
///   header/payload segments
pub fn check_shape(token: &str) -> Result<(), JwtShapeError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtShapeError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let header = parts.next().unwrap_or_default();
    let payload = parts.next().unwrap_or_default();
    let has_signature = parts.next().is_some();

    if header.is_empty() || payload.is_empty() || !has_signature || parts.next().is_some() {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtShapeError::Malformed);
    }

    Ok(())
}

/// Read the `alg` header value without verifying anything.
///
/// Used only to label rejected tokens in logs (e.g. an `HS256` token
/// presented to an `EdDSA` verifier). Never use the result to choose a key or
/// algorithm.
///
/// # Errors
///
/// Returns the same errors as [`check_shape`], and `Malformed` if the header
/// is not base64url JSON with a string `alg` member.
pub fn peek_algorithm(token: &str) -> Result<String, JwtShapeError> {
    check_shape(token)?;

    let header_part = token.split('.').next().ok_or(JwtShapeError::Malformed)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtShapeError::Malformed
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtShapeError::Malformed
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtShapeError::Malformed)
}
