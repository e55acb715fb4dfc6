//! HTTP request handlers.

pub mod auth_handler;
pub mod health;
pub mod metrics;

pub use auth_handler::{handle_issue, handle_issue_for_user, handle_refresh};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
