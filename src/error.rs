use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::error::{TokenError, TokenErrorKind};
use crate::auth::password::PasswordError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Error returned by handlers and extractors.
///
/// Every client-caused authentication failure renders as the same 401 body;
/// the distinction between them only exists in the logs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::Token(e) => match e.kind() {
                TokenErrorKind::InvalidToken
                | TokenErrorKind::NotFound
                | TokenErrorKind::Revoked => {
                    (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                }
                TokenErrorKind::Persistence => {
                    error!(error = %e, "token store unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "service temporarily unavailable".to_string(),
                    )
                }
                TokenErrorKind::Signing => {
                    error!(error = %e, "token signing failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            AppError::Password(e) => {
                error!(error = %e, "password check failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::CacheError;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn terminal_token_errors_are_indistinguishable() {
        let a = body_of(TokenError::InvalidToken("bad signature".into()).into()).await;
        let b = body_of(TokenError::NotFound.into()).await;
        let c = body_of(TokenError::Revoked.into()).await;
        let d = body_of(AppError::Unauthorized).await;
        assert_eq!(a.0, StatusCode::UNAUTHORIZED);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert_eq!(a.1["success"], false);
    }

    #[tokio::test]
    async fn persistence_is_retryable_and_signing_is_internal() {
        let (status, body) = body_of(
            TokenError::Persistence(CacheError::Unavailable("down".into())).into(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body["message"].as_str().unwrap_or_default().contains("down"));

        let (status, _) = body_of(TokenError::Signing("bad key".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unusable_password_hash_is_a_generic_500() {
        let err = crate::auth::password::verify_password("pw", "not-a-hash").unwrap_err();
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
