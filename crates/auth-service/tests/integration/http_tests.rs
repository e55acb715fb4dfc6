//! HTTP surface tests
//!
//! Drives a real server over TCP: issue, refresh (JSON and form bodies),
//! legacy aliases, and the shape of every rejection.

use auth_service::errors::REJECTED_CREDENTIALS_MESSAGE;
use auth_service::models::TokenResponse;
use auth_test_utils::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_issue_endpoint_returns_token_pair() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/token", server.url()))
        .json(&serde_json::json!({
            "user_id": TEST_USER_ALICE,
            "custom_claims": {"tenant": "acme"}
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["token_type"].as_str(), Some("Bearer"));
    assert_eq!(body["expires_in"].as_i64(), Some(900));
    assert!(body["refresh_token"].as_str().is_some_and(|s| !s.is_empty()));

    let access_token = body["access_token"].as_str().unwrap_or_default().to_string();
    access_token
        .assert_valid_jwt("HS256")
        .assert_for_subject(TEST_USER_ALICE)
        .assert_has_claim("tenant", "acme");
    Ok(())
}

#[tokio::test]
async fn test_refresh_endpoint_rotates_and_rejects_replay() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let first = server.issue_tokens(TEST_USER_U1).await?;

    let response = server
        .refresh(&first.access_token, &first.refresh_token)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let second: TokenResponse = response.json().await?;
    assert_ne!(second.refresh_token, first.refresh_token);

    let replay = server
        .refresh(&first.access_token, &first.refresh_token)
        .await?;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_refresh_accepts_form_body() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let tokens = server.issue_tokens(TEST_USER_BOB).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/token/refresh", server.url()))
        .bearer_auth(&tokens.access_token)
        .form(&[("refresh_token", tokens.refresh_token.as_str())])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let rotated: TokenResponse = response.json().await?;
    rotated.access_token.assert_for_subject(TEST_USER_BOB);
    Ok(())
}

#[tokio::test]
async fn test_legacy_aliases() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    // GET /token/:user_id issues
    let response = client
        .get(format!("{}/token/{}", server.url(), TEST_USER_CHARLIE))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens: TokenResponse = response.json().await?;
    tokens.access_token.assert_for_subject(TEST_USER_CHARLIE);

    // POST /refresh rotates, with the bare token in Authorization
    let response = client
        .post(format!("{}/refresh", server.url()))
        .header("Authorization", tokens.access_token.as_str())
        .json(&serde_json::json!({ "refresh_token": tokens.refresh_token }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

/// Every credential rejection must look the same on the wire.
#[tokio::test]
async fn test_rejections_are_indistinguishable() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let alice = server.issue_tokens(TEST_USER_ALICE).await?;
    let bob = server.issue_tokens(TEST_USER_BOB).await?;

    let stranger = TestTokenBuilder::new()
        .for_user("never-issued")
        .sign_with(server.token_service().signer())?;

    let cases = [
        // wrong secret
        (alice.access_token.clone(), TEST_UNISSUED_REFRESH_SECRET.to_string()),
        // another user's secret
        (alice.access_token.clone(), bob.refresh_token.clone()),
        // no record for subject
        (stranger, TEST_UNISSUED_REFRESH_SECRET.to_string()),
        // garbage access token
        ("not-a-jwt".to_string(), alice.refresh_token.clone()),
    ];

    let mut bodies = Vec::new();
    for (access_token, refresh_token) in &cases {
        let response = server.refresh(access_token, refresh_token).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer error=\"invalid_token\"")
        );
        bodies.push(response.text().await?);
    }

    assert!(bodies.windows(2).all(|w| w.first() == w.get(1)));

    let body: serde_json::Value = serde_json::from_str(bodies.first().map_or("", String::as_str))?;
    assert_eq!(body["error"]["code"].as_str(), Some("INVALID_GRANT"));
    assert_eq!(
        body["error"]["message"].as_str(),
        Some(REJECTED_CREDENTIALS_MESSAGE)
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_return_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let tokens = server.issue_tokens(TEST_USER_ALICE).await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/token/refresh", server.url());

    // No Authorization header
    let response = client
        .post(&url)
        .json(&serde_json::json!({ "refresh_token": tokens.refresh_token }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No refresh_token field
    let response = client
        .post(&url)
        .bearer_auth(&tokens.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"].as_str(), Some("INVALID_REQUEST"));

    // Empty user id
    let response = client
        .post(format!("{}/api/v1/token", server.url()))
        .json(&serde_json::json!({ "user_id": "" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The secret was not consumed by the rejected requests
    let response = server
        .refresh(&tokens.access_token, &tokens.refresh_token)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_malformed_issue_body_returns_invalid_request() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/token", server.url());

    // JSON without user_id
    let missing_user = client
        .post(&url)
        .json(&serde_json::json!({ "custom_claims": {"tenant": "acme"} }))
        .send()
        .await?;

    // Valid JSON sent as text/plain
    let wrong_content_type = client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "text/plain")
        .body(r#"{"user_id":"alice"}"#)
        .send()
        .await?;

    for response in [missing_user, wrong_content_type] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["error"]["code"].as_str(), Some("INVALID_REQUEST"));
    }
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_served() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
