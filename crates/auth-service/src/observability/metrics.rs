//! Metrics definitions for the token lifecycle service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `operation`: issue, rotate (token metrics); hash, verify (bcrypt);
//!   save, get, replace, ping (store)
//! - `status`: success, error (plus `conflict` for store replace)
//! - `error_category`: authentication, cryptographic, persistence, internal
//! - `path`: fixed set of routes, everything else is `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `GET /metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    build_prometheus()?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Builder with the service's histogram buckets, not yet installed.
///
/// Exposed so test harnesses can fall back to a detached handle when a
/// global recorder is already installed in the same process.
pub fn build_prometheus() -> Result<PrometheusBuilder, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("auth_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Issue and rotate are dominated by one or two bcrypt runs
        .set_buckets_for_metric(
            Matcher::Prefix("auth_token_issuance".to_string()),
            &[0.050, 0.100, 0.200, 0.300, 0.500, 0.750, 1.000, 2.000, 5.000],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        // Coarse buckets only; fine-grained bcrypt timings are a side channel
        .set_buckets_for_metric(
            Matcher::Full("auth_bcrypt_duration_seconds".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `auth_token_issuance_duration_seconds`, `auth_token_issuance_total`
/// Labels: `operation` (issue, rotate), `status`
pub fn record_token_issuance(operation: &str, status: &str, duration: Duration) {
    histogram!("auth_token_issuance_duration_seconds", "operation" => operation.to_string(), "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("auth_token_issuance_total", "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record access token validation result
///
/// Metric: `auth_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

/// Record a rotation that lost the compare-and-swap race.
///
/// Metric: `auth_rotation_conflicts_total`
pub fn record_rotation_conflict() {
    counter!("auth_rotation_conflicts_total").increment(1);
}

/// Record bcrypt operation duration
///
/// Metric: `auth_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify)
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("auth_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record a credential store call
///
/// Metric: `auth_store_operations_total`
/// Labels: `operation`, `status`
pub fn record_store_operation(operation: &str, status: &str) {
    counter!("auth_store_operations_total", "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `auth_http_requests_total`, `auth_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("auth_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("auth_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Map a request path to a bounded label.
///
/// The legacy `/token/{user_id}` route carries a caller-controlled segment,
/// which must never reach a label.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/token" => "/api/v1/token",
        "/api/v1/token/refresh" => "/api/v1/token/refresh",
        "/refresh" => "/refresh",
        p if p.starts_with("/token/") => "/token/{user_id}",
        _ => "/other",
    }
}
