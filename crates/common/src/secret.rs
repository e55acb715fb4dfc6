//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Refresh secrets,
//! signing keys and any other credential material must be held in one of these
//! wrappers from the moment it is created until it is handed to the caller.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct deriving `Debug` that contains one is safe to pass to `tracing`.
//! Values are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct IssuedPair {
//!     access_token: String,
//!     refresh_token: SecretString,
//! }
//!
//! let pair = IssuedPair {
//!     access_token: "header.payload.signature".to_string(),
//!     refresh_token: SecretString::from("q1w2e3r4"),
//! };
//!
//! // Debug output redacts the refresh secret
//! assert!(!format!("{pair:?}").contains("q1w2e3r4"));
//!
//! // Reading the value requires an explicit call
//! let raw: &str = pair.refresh_token.expose_secret();
//! assert_eq!(raw, "q1w2e3r4");
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - Refresh secrets (plaintext, base64 encoded)
//! - Bearer tokens received from clients
//!
//! Use `SecretBox<Vec<u8>>` for:
//! - HMAC signing keys
//! - PKCS#8 private keys

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
