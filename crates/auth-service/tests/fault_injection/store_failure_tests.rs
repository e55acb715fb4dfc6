//! Fault injection tests for credential store failures
//!
//! These tests validate that store failures never hand out unusable pairs,
//! never burn a valid refresh secret, and surface as generic errors over HTTP:
//! - Save failure on issue returns no pair
//! - Replace failure on rotate keeps the old secret valid
//! - A stalled store hits the request deadline (503) before anything is
//!   written, so the same pair can be retried
//! - A write that commits but acknowledges after the deadline still delivers
//!   the stored pair

use auth_service::errors::TokenError;
use auth_service::models::TokenResponse;
use auth_test_utils::*;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_issue_save_failure_returns_no_pair() -> Result<(), anyhow::Error> {
    let store = Arc::new(FaultyStore::new());
    let service = TestConfigBuilder::hmac().build_service(store.clone())?;

    store.fail(StoreOp::Save, true);
    let result = service.issue(TEST_USER_ALICE, &BTreeMap::new()).await;
    assert!(matches!(result, Err(TokenError::Persistence(_))));
    assert!(store.inner().is_empty().await);

    // Retry after recovery succeeds
    store.fail(StoreOp::Save, false);
    service.issue(TEST_USER_ALICE, &BTreeMap::new()).await?;
    assert_eq!(store.save_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_rotate_replace_failure_keeps_old_secret() -> Result<(), anyhow::Error> {
    let store = Arc::new(FaultyStore::new());
    let service = TestConfigBuilder::hmac().build_service(store.clone())?;
    let pair = service.issue(TEST_USER_ALICE, &BTreeMap::new()).await?;

    store.fail(StoreOp::Replace, true);
    let result = service
        .rotate(&pair.access_token, &pair.refresh_token)
        .await;
    assert!(matches!(
        result,
        Err(TokenError::Persistence(ref msg)) if msg == "injected Replace failure"
    ));

    // The same secret works once the store recovers
    store.fail(StoreOp::Replace, false);
    service
        .rotate(&pair.access_token, &pair.refresh_token)
        .await?;
    assert_eq!(store.replace_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_rotate_lookup_failure_is_persistence_not_rejection() -> Result<(), anyhow::Error> {
    let store = Arc::new(FaultyStore::new());
    let service = TestConfigBuilder::hmac().build_service(store.clone())?;
    let pair = service.issue(TEST_USER_BOB, &BTreeMap::new()).await?;

    store.fail(StoreOp::Get, true);
    let result = service
        .rotate(&pair.access_token, &pair.refresh_token)
        .await;
    match result {
        Err(e) => {
            assert!(matches!(e, TokenError::Persistence(_)));
            assert!(!e.is_credential_rejection());
        }
        Ok(_) => anyhow::bail!("rotation must fail while the store is down"),
    }
    assert_eq!(store.replace_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_store_failure_over_http_is_generic_500() -> Result<(), anyhow::Error> {
    let store = Arc::new(FaultyStore::new());
    let server = TestAuthServer::spawn_with(
        TestConfigBuilder::hmac(),
        store.clone(),
        TEST_REQUEST_DEADLINE,
    )
    .await?;
    let tokens: TokenResponse = server.issue_tokens(TEST_USER_ALICE).await?;

    store.fail(StoreOp::Replace, true);
    let response = server
        .refresh(&tokens.access_token, &tokens.refresh_token)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.text().await?;
    assert!(body.contains("INTERNAL_ERROR"));
    assert!(
        !body.contains("injected"),
        "Backend error details must not reach the client"
    );

    store.fail(StoreOp::Replace, false);
    let response = server
        .refresh(&tokens.access_token, &tokens.refresh_token)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_stalled_rotation_hits_deadline_and_retry_succeeds() -> Result<(), anyhow::Error> {
    let store = Arc::new(FaultyStore::new());
    let server = TestAuthServer::spawn_with(
        TestConfigBuilder::hmac(),
        store.clone(),
        Duration::from_millis(500),
    )
    .await?;
    let tokens = server.issue_tokens(TEST_USER_CHARLIE).await?;

    store.set_delay(Duration::from_secs(3));
    let response = server
        .refresh(&tokens.access_token, &tokens.refresh_token)
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"].as_str(), Some("UNAVAILABLE"));
    assert_eq!(store.replace_calls(), 0);

    // Nothing was written, so the same pair still rotates
    store.set_delay(Duration::ZERO);
    let response = server
        .refresh(&tokens.access_token, &tokens.refresh_token)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_slow_commit_acknowledgement_delivers_stored_pair() -> Result<(), anyhow::Error> {
    let store = Arc::new(FaultyStore::new());
    let service = TestConfigBuilder::hmac().build_service(store.clone())?;
    let first = service.issue(TEST_USER_U1, &BTreeMap::new()).await?;

    // The swap commits at once, then acknowledges well after the deadline
    store.set_replace_ack_delay(Duration::from_millis(2000));
    let second = service
        .rotate_within(
            Duration::from_millis(1000),
            &first.access_token,
            &first.refresh_token,
        )
        .await?;
    store.set_replace_ack_delay(Duration::ZERO);

    let replay = service
        .rotate(&first.access_token, &first.refresh_token)
        .await;
    assert!(matches!(replay, Err(TokenError::InvalidRefreshToken)));

    // The delivered pair is the live one
    service
        .rotate(&second.access_token, &second.refresh_token)
        .await?;
    Ok(())
}
