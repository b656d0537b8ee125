pub mod app_error;
pub mod auth_error;

use serde::Serialize;

pub use app_error::{AppError, AppResult};
pub use auth_error::{AuthError, AuthResult};

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_kind: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind,
            message: message.into(),
        }
    }
}
