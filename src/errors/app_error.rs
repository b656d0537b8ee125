use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::ErrorResponse;
use crate::core::{MeteringError, ProviderError};
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Not enough credits: {required} required, {remaining} remaining")]
    QuotaExceeded { required: u64, remaining: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable kind, stable across message changes
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::QuotaExceeded { .. } => "quota_exceeded",
            AppError::Provider(_) => "provider_failure",
            AppError::Forbidden(_) => "forbidden",
            AppError::Store(StoreError::Conflict(_)) => "conflict",
            AppError::Store(_) | AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Store(StoreError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            AppError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            AppError::Provider(ProviderError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Provider(ProviderError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MeteringError> for AppError {
    fn from(err: MeteringError) -> Self {
        match err {
            MeteringError::Store(e) => AppError::Store(e),
            MeteringError::AccountNotFound(_) => AppError::NotFound("Account not found".to_string()),
            MeteringError::Aborted(reason) => AppError::Internal(reason),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match &self {
            // Internal details stay in the log
            AppError::Store(StoreError::Conflict(msg)) => msg.clone(),
            AppError::Store(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_kind = kind, error = %self, "Request failed");
        } else {
            tracing::debug!(error_kind = kind, error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse::new(kind, message))).into_response()
    }
}
