//! Integration tests for health probes
//!
//! These tests validate the liveness and readiness probe endpoints that an
//! orchestrator uses to decide health and traffic routing.

use auth_test_utils::*;
use reqwest::StatusCode;
use std::sync::Arc;

// ============================================================================
// Liveness Probe Tests
// ============================================================================

/// The liveness probe returns 200 OK as long as the process can serve HTTP.
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Health check should return 200 OK"
    );
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

// ============================================================================
// Readiness Probe Tests
// ============================================================================

/// Readiness returns 200 while the credential store answers.
#[tokio::test]
async fn test_ready_endpoint_returns_ok_when_healthy() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Readiness check should return 200 OK when healthy"
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"].as_str(), Some("ready"));
    assert_eq!(body["credential_store"].as_str(), Some("healthy"));
    assert!(body.get("error").is_none());

    Ok(())
}

/// Readiness returns 503 when the store stops answering, while liveness
/// stays green.
#[tokio::test]
async fn test_ready_endpoint_returns_503_when_store_unavailable() -> Result<(), anyhow::Error> {
    // Arrange
    let store = Arc::new(FaultyStore::new());
    let server = TestAuthServer::spawn_with(
        TestConfigBuilder::hmac(),
        store.clone(),
        TEST_REQUEST_DEADLINE,
    )
    .await?;
    let client = reqwest::Client::new();

    // Act
    store.fail(StoreOp::Ping, true);
    let response = client.get(format!("{}/ready", server.url())).send().await?;

    // Assert
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"].as_str(), Some("not_ready"));
    assert_eq!(body["credential_store"].as_str(), Some("unhealthy"));

    let error = body["error"].as_str().unwrap_or_default();
    assert_eq!(error, "Service dependencies unavailable");
    assert!(
        !error.contains("injected"),
        "Readiness must not expose backend error details"
    );

    let response = client.get(format!("{}/health", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Recovery
    store.fail(StoreOp::Ping, false);
    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
