//! Account and session endpoints under `/api/auth`.

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{
    Auth, MIN_PASSWORD_LEN, TokenPurpose, hash_password, verify_password,
};
use crate::errors::{AppError, AppResult, AuthError, AuthResult};
use crate::state::AppState;
use crate::store::{Account, AccountUpdate, NewAccount, Plan, normalize_identity};

/// Minimum display name length, in characters
pub const MIN_USERNAME_LEN: usize = 2;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    #[serde(alias = "Email")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "Email")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(alias = "Email")]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "current_password")]
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

/// Public view of an account, never carrying the password verifier
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub plan: Plan,
    pub credits_used: u64,
    pub credits_limit: u64,
    pub credits_remaining: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            username: account.display_name.clone(),
            avatar_url: account.avatar_url.clone(),
            plan: account.plan,
            credits_used: account.credits_used,
            credits_limit: account.credits_limit,
            credits_remaining: account.credits_remaining(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user_info: AccountView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub plan: Plan,
    pub credits_used: u64,
    pub credits_limit: u64,
    pub credits_remaining: u64,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: AccountView,
    pub account: AccountSummary,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: String,
    pub user: AccountView,
}

/// Loose shape check: one `@`, a non-empty local part and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn check_username(username: &str) -> AppResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_off_thread(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn verify_off_thread(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn load_account(state: &AppState, account_id: &str) -> AppResult<Account> {
    state
        .accounts
        .find_by_id(account_id)?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
}

/// `POST /api/auth/signup`
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let username = request.username.trim().to_string();
    let email = normalize_identity(&request.email);

    check_username(&username)?;
    if !is_plausible_email(&email) {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }
    check_password(&request.password)?;

    let password_hash = hash_off_thread(request.password).await?;
    let account = state.accounts.create(NewAccount {
        email,
        display_name: username,
        password_hash,
        credits_limit: state.config.metering.default_credits_limit,
    })?;

    let token = state
        .tokens
        .issue_session(&account.id, &account.email)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(account_id = %account.id, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            success: true,
            message: "Account created successfully".to_string(),
            token,
            user_info: AccountView::from(&account),
        }),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AuthResult<Json<SessionResponse>> {
    let email = normalize_identity(&request.email);
    let account = state
        .accounts
        .find_by_identity(&email)
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::InvalidCredentials)?;

    let matches = verify_off_thread(request.password, account.password_hash.clone())
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    if !matches {
        info!(account_id = %account.id, "Login rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }
    if !account.is_active {
        return Err(AuthError::AccountInactive);
    }

    let now = Utc::now();
    let update = AccountUpdate {
        last_login_at: Some(now),
        ..Default::default()
    };
    if let Err(e) = state.accounts.update_fields(&account.id, &update) {
        warn!(account_id = %account.id, error = %e, "Failed to record last login");
    }

    let token = state
        .tokens
        .issue_session(&account.id, &account.email)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    info!(account_id = %account.id, "Login succeeded");

    Ok(Json(SessionResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user_info: AccountView::from(&account),
    }))
}

/// `POST /api/auth/forgot-password`
///
/// Answers the same way whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_identity(&request.email);

    match state.accounts.find_by_identity(&email) {
        Ok(Some(account)) if account.is_active => {
            match state
                .tokens
                .issue_single_purpose(&account.email, TokenPurpose::PasswordReset, None)
            {
                Ok(token) => state.notifier.deliver(&account.email, &token),
                Err(e) => warn!(account_id = %account.id, error = %e, "Failed to issue reset token"),
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Account lookup failed during password reset request"),
    }

    Ok(Json(MessageResponse::ok(
        "If an account exists for this email, a password reset link has been sent",
    )))
}

/// `POST /api/auth/reset-password`
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = state
        .tokens
        .verify_single_purpose(&request.token, TokenPurpose::PasswordReset)
        .map_err(|_| AppError::InvalidInput("Invalid or expired reset token".to_string()))?;
    check_password(&request.new_password)?;

    let account = state
        .accounts
        .find_by_identity(&email)?
        .ok_or_else(|| AppError::InvalidInput("Invalid or expired reset token".to_string()))?;

    let password_hash = hash_off_thread(request.new_password).await?;
    state.accounts.update_fields(
        &account.id,
        &AccountUpdate {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )?;

    info!(account_id = %account.id, "Password reset completed");
    Ok(Json(MessageResponse::ok("Password has been reset successfully")))
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> AppResult<Json<MeResponse>> {
    let account = load_account(&state, &auth.account_id)?;

    Ok(Json(MeResponse {
        success: true,
        user: AccountView::from(&account),
        account: AccountSummary {
            plan: account.plan,
            credits_used: account.credits_used,
            credits_limit: account.credits_limit,
            credits_remaining: account.credits_remaining(),
            email_verified: account.email_verified,
            created_at: account.created_at,
            last_login: account.last_login_at,
        },
    }))
}

/// `PUT /api/auth/profile`
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Json(request): Json<ProfileUpdateRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let display_name = request.username.map(|name| name.trim().to_string());
    if let Some(name) = &display_name {
        check_username(name)?;
    }
    let avatar_url = request.avatar_url.map(|url| url.trim().to_string());

    if display_name.is_none() && avatar_url.is_none() {
        return Err(AppError::InvalidInput("No fields to update".to_string()));
    }

    let updated = state.accounts.update_fields(
        &auth.account_id,
        &AccountUpdate {
            display_name,
            avatar_url,
            ..Default::default()
        },
    )?;
    if !updated {
        return Err(AppError::NotFound("Account not found".to_string()));
    }

    let account = load_account(&state, &auth.account_id)?;
    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
        user: AccountView::from(&account),
    }))
}

/// `POST /api/auth/change-password`
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if request.new_password != request.confirm_password {
        return Err(AppError::InvalidInput("Passwords do not match".to_string()));
    }
    check_password(&request.new_password)?;

    let account = load_account(&state, &auth.account_id)?;
    if !verify_off_thread(request.old_password, account.password_hash).await? {
        return Err(AppError::InvalidInput(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_off_thread(request.new_password).await?;
    state.accounts.update_fields(
        &account.id,
        &AccountUpdate {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )?;

    info!(account_id = %account.id, "Password changed");
    Ok(Json(MessageResponse::ok("Password changed successfully")))
}

/// `DELETE /api/auth/profile`
///
/// Removes the account together with its ledger and cached voices.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Json(request): Json<DeleteAccountRequest>,
) -> AppResult<Json<MessageResponse>> {
    let account = load_account(&state, &auth.account_id)?;
    if !verify_off_thread(request.password, account.password_hash).await? {
        return Err(AppError::Forbidden("Password is incorrect".to_string()));
    }

    let purge = state.accounts.purge(&account.id)?;
    if !purge.deleted {
        return Err(AppError::NotFound("Account not found".to_string()));
    }

    info!(
        account_id = %account.id,
        records = purge.records,
        voices = purge.voices,
        "Account deleted"
    );
    Ok(Json(MessageResponse::ok("Account deleted successfully")))
}
