use crate::errors::TokenError;
use crate::models::{IssueRequest, RefreshRequest, TokenResponse};
use crate::routes::AppState;
use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header, HeaderMap},
    Form, Json,
};
use common::secret::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Handle token issuance
///
/// POST /api/v1/token
pub async fn handle_issue(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<TokenResponse>, TokenError> {
    let payload = read_issue_request(request).await?;

    let pair = state
        .token_service
        .issue_within(state.request_deadline, &payload.user_id, &payload.custom_claims)
        .await?;

    Ok(Json(pair.into()))
}

/// Handle token issuance by path parameter
///
/// GET /token/:user_id
pub async fn handle_issue_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<TokenResponse>, TokenError> {
    let pair = state
        .token_service
        .issue_within(state.request_deadline, &user_id, &BTreeMap::new())
        .await?;

    Ok(Json(pair.into()))
}

/// Handle token rotation
///
/// POST /api/v1/token/refresh (also POST /refresh)
///
/// Accepts:
/// - Access token via `Authorization: Bearer <token>` (a bare token is accepted)
/// - Refresh token via JSON body or form field `refresh_token`
pub async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<TokenResponse>, TokenError> {
    let access_token = extract_access_token(request.headers())?;
    let refresh_token = read_refresh_token(request).await?;

    let pair = state
        .token_service
        .rotate_within(state.request_deadline, &access_token, &refresh_token)
        .await?;

    Ok(Json(pair.into()))
}

/// Extract the access token from the Authorization header.
fn extract_access_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .ok_or(TokenError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();

    if token.is_empty() {
        return Err(TokenError::MissingCredentials);
    }

    Ok(token.to_string())
}

/// Parse the JSON issuance body.
///
/// A wrong content type, malformed JSON or a missing `user_id` is reported
/// as a missing credential rather than the extractor's own rejection.
async fn read_issue_request(request: Request) -> Result<IssueRequest, TokenError> {
    Json::<IssueRequest>::from_request(request, &())
        .await
        .map(|Json(body)| body)
        .map_err(|_| TokenError::MissingCredentials)
}

/// Read `refresh_token` from a form or JSON body.
///
/// An unreadable body is treated the same as a missing field.
async fn read_refresh_token(request: Request) -> Result<SecretString, TokenError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let body = if is_form {
        Form::<RefreshRequest>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .ok()
    } else {
        Json::<RefreshRequest>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .ok()
    };

    body.and_then(|body| body.refresh_token)
        .filter(|secret| !secret.expose_secret().is_empty())
        .ok_or(TokenError::MissingCredentials)
}
