//! # Auth Test Utilities
//!
//! Shared test utilities for the token lifecycle service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed HMAC and Ed25519 keys)
//! - Test configuration and token builders
//! - Fault-injecting credential stores
//! - Server test harness (TestAuthServer for E2E tests)
//! - Fixed test user IDs
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let service = TestConfigBuilder::hmac().build_service_in_memory()?;
//!
//!     let pair = service.issue(TEST_USER_ALICE, &Default::default()).await?;
//!
//!     pair.access_token
//!         .assert_valid_jwt("HS256")
//!         .assert_for_subject(TEST_USER_ALICE);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod config_builder;
pub mod crypto_fixtures;
pub mod fault_stores;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use config_builder::*;
pub use crypto_fixtures::*;
pub use fault_stores::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
