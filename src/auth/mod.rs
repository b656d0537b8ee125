//! Identity: password verifiers, signed tokens, the per-request auth
//! context and password-reset delivery.

pub mod password;
pub mod token;

use subtle::ConstantTimeEq;

pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};
pub use token::{Claims, SessionClaims, TokenError, TokenPurpose, TokenService};

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub account_id: String,
    pub email: String,
}

impl Auth {
    pub fn new(account_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            email: email.into(),
        }
    }
}

/// Compare a presented admin key with the configured one in constant time.
///
/// Always false when no key is configured.
pub fn admin_key_matches(configured: Option<&str>, presented: &str) -> bool {
    match configured {
        Some(expected) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(presented.as_bytes()).into()
        }
        _ => false,
    }
}

/// Delivers password reset tokens to their owner.
pub trait ResetNotifier: Send + Sync {
    fn deliver(&self, email: &str, token: &str);
}

/// Logs reset requests. Used when no mail transport is configured.
///
/// The token itself is only emitted at `debug`.
#[derive(Debug, Default)]
pub struct LogResetNotifier;

impl ResetNotifier for LogResetNotifier {
    fn deliver(&self, email: &str, token: &str) {
        tracing::info!(email = %email, "Password reset token issued");
        tracing::debug!(email = %email, reset_token = %token, "Password reset token");
    }
}
