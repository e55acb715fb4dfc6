//! Common utilities shared by the token lifecycle crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT pre-parse checks (size limit, header inspection)
pub mod jwt;
