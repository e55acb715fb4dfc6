//! Token lifecycle service library
//!
//! Issues short-lived signed access tokens paired with single-use refresh
//! secrets, and rotates them. Only a bcrypt hash of each refresh secret is
//! persisted.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Access token signing/verification, refresh secret generation and hashing
//! - `errors` - Error taxonomy and its HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `models` - Data models
//! - `repositories` - Credential store interface and backends
//! - `services` - Token issue/rotate orchestration

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
