//! Operator commands run from the CLI instead of the HTTP surface.

use anyhow::{Context, Result, bail};

use crate::auth::{MIN_PASSWORD_LEN, hash_password};
use crate::config::ServerConfig;
use crate::core::UsageReport;
use crate::state::AppState;
use crate::store::{AccountStore, AccountUpdate, Database, SqliteAccountStore, normalize_identity};

fn open_accounts(config: &ServerConfig) -> Result<SqliteAccountStore> {
    let db = Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok(SqliteAccountStore::new(db))
}

/// Build the admin usage report.
pub async fn report(config: ServerConfig) -> Result<UsageReport> {
    let state = AppState::new(config).await?;
    Ok(state.analytics.report(chrono::Utc::now()).await)
}

/// Zero the credit counter of the account registered under `email`.
pub fn reset_usage(config: &ServerConfig, email: &str) -> Result<()> {
    let accounts = open_accounts(config)?;
    let email = normalize_identity(email);
    let account = accounts
        .find_by_identity(&email)?
        .with_context(|| format!("no account registered for {email}"))?;

    accounts.reset_usage(&account.id)?;
    tracing::info!(
        account_id = %account.id,
        previous_used = account.credits_used,
        "Credit usage reset"
    );
    Ok(())
}

/// Replace the password of the account registered under `email`.
pub fn set_password(config: &ServerConfig, email: &str, password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }

    let accounts = open_accounts(config)?;
    let email = normalize_identity(email);
    let account = accounts
        .find_by_identity(&email)?
        .with_context(|| format!("no account registered for {email}"))?;

    let password_hash = hash_password(password)?;
    accounts.update_fields(
        &account.id,
        &AccountUpdate {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )?;
    tracing::info!(account_id = %account.id, "Password replaced by operator");
    Ok(())
}
