use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure modes of the token lifecycle.
///
/// The variants are distinct so callers and logs can tell them apart, but
/// every credential-validation variant collapses to the same HTTP response
/// (see [`TokenError::is_credential_rejection`]).
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Access token is malformed")]
    MalformedToken,

    #[error("Access token signature does not match")]
    SignatureMismatch,

    #[error("Access token has expired")]
    Expired,

    #[error("Refresh secret does not match the stored credential")]
    InvalidRefreshToken,

    #[error("No refresh credential on record for subject")]
    NoSuchRecord,

    #[error("Access token presented for rotation is invalid")]
    InvalidAccessToken,

    #[error("Stored refresh hash is corrupt")]
    CorruptHash,

    #[error("Missing user identifier, access token or refresh secret")]
    MissingCredentials,

    #[error("Operation exceeded its deadline")]
    DeadlineExceeded,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Randomness source unavailable: {0}")]
    Randomness(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Hashing error: {0}")]
    Hashing(String),
}

impl TokenError {
    /// True for every failure caused by the presented credentials rather than
    /// by the service. These must be indistinguishable to the client.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::MalformedToken
                | TokenError::SignatureMismatch
                | TokenError::Expired
                | TokenError::InvalidRefreshToken
                | TokenError::NoSuchRecord
                | TokenError::InvalidAccessToken
        )
    }

    /// Low-cardinality label used for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            TokenError::MalformedToken
            | TokenError::SignatureMismatch
            | TokenError::Expired
            | TokenError::InvalidRefreshToken
            | TokenError::NoSuchRecord
            | TokenError::InvalidAccessToken
            | TokenError::MissingCredentials => "authentication",
            TokenError::CorruptHash
            | TokenError::Randomness(_)
            | TokenError::Signing(_)
            | TokenError::Hashing(_) => "cryptographic",
            TokenError::Persistence(_) => "persistence",
            TokenError::DeadlineExceeded => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

/// Generic message returned for every rejected credential.
pub const REJECTED_CREDENTIALS_MESSAGE: &str = "The supplied credentials were rejected";

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let (status, code, message) = if self.is_credential_rejection() {
            (
                StatusCode::UNAUTHORIZED,
                "INVALID_GRANT",
                REJECTED_CREDENTIALS_MESSAGE,
            )
        } else {
            match &self {
                TokenError::MissingCredentials => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_REQUEST",
                    "The request is missing a required credential",
                ),
                TokenError::DeadlineExceeded => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UNAVAILABLE",
                    "The service is temporarily unavailable",
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                ),
            }
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }

        response
    }
}
