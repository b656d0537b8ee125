use crate::auth::Auth;
use crate::errors::auth_error::AuthError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Extract the bearer token from the `Authorization` header
///
/// # Returns
/// * `Result<&str, AuthError>` - The token or an error
fn extract_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?;

    let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Authentication middleware for account routes
///
/// The middleware:
/// 1. Extracts the bearer token from the Authorization header
/// 2. Verifies it as a session token (reset tokens are refused)
/// 3. Loads the account and refuses deleted or deactivated ones
/// 4. Inserts an [`Auth`] into request extensions
///
/// # Returns
/// * `Result<Response, AuthError>` - The response from the next handler or an auth error
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "Starting authentication validation"
    );

    let claims = {
        let token = extract_token(&request)?;
        state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AuthError::InvalidToken
        })?
    };

    let account = state
        .accounts
        .find_by_id(&claims.account_id)
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::AccountNotFound)?;

    if !account.is_active {
        tracing::info!(account_id = %account.id, "Inactive account presented a valid token");
        return Err(AuthError::AccountInactive);
    }

    request
        .extensions_mut()
        .insert(Auth::new(account.id, account.email));

    Ok(next.run(request).await)
}
