use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::ErrorResponse;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header")]
    InvalidAuthHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication failed: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AccountInactive => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => "unauthenticated",
            AuthError::InvalidToken | AuthError::AccountNotFound => "invalid_token",
            AuthError::AccountInactive => "account_inactive",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Internal(e) => {
                tracing::error!(error = %e, "Authentication backend failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorResponse::new(self.kind(), message))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                http::header::WWW_AUTHENTICATE,
                http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
