//! Signed, expiring identity tokens.
//!
//! Session tokens carry the account id and e-mail. Single-purpose tokens
//! (password reset) carry only the e-mail. Both embed a `purpose` claim and
//! verification checks it, so neither kind can stand in for the other.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id; absent on single-purpose tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub email: String,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
}

/// Verified session identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub account_id: String,
    pub email: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token malformed or signature mismatch")]
    Invalid,

    #[error("token issued for a different purpose")]
    WrongPurpose,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

/// Issues and verifies HS256 tokens with one static secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], session_ttl: Duration, reset_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl,
            reset_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.session_ttl(),
            config.reset_ttl(),
        )
    }

    /// Issue a session token with the configured lifetime.
    pub fn issue_session(&self, account_id: &str, email: &str) -> Result<String, TokenError> {
        self.issue(account_id, email, self.session_ttl)
    }

    /// Issue a session token with an explicit lifetime.
    pub fn issue(&self, account_id: &str, email: &str, ttl: Duration) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        self.sign(&Claims {
            sub: Some(account_id.to_string()),
            email: email.to_string(),
            purpose: TokenPurpose::Session,
            iat,
            exp: expiry(iat, ttl),
        })
    }

    /// Issue a token bound to one purpose. `ttl` defaults to the reset lifetime.
    pub fn issue_single_purpose(
        &self,
        email: &str,
        purpose: TokenPurpose,
        ttl: Option<Duration>,
    ) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let ttl = ttl.unwrap_or(self.reset_ttl);
        self.sign(&Claims {
            sub: None,
            email: email.to_string(),
            purpose,
            iat,
            exp: expiry(iat, ttl),
        })
    }

    /// Verify a session token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let claims = self.decode(token)?;
        if claims.purpose != TokenPurpose::Session {
            return Err(TokenError::WrongPurpose);
        }
        let account_id = claims.sub.ok_or(TokenError::Invalid)?;

        Ok(SessionClaims {
            account_id,
            email: claims.email,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Verify a single-purpose token and return the e-mail it targets.
    pub fn verify_single_purpose(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<String, TokenError> {
        let claims = self.decode(token)?;
        if claims.purpose != purpose || claims.sub.is_some() {
            return Err(TokenError::WrongPurpose);
        }
        Ok(claims.email)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// `iat + ttl`, clamped so a huge lifetime cannot wrap into the past
fn expiry(iat: i64, ttl: Duration) -> i64 {
    iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            b"test-secret",
            Duration::from_secs(3600),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn session_round_trip() {
        let tokens = service();
        let token = tokens.issue_session("acct-1", "a@example.com").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.account_id, "acct-1");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.expires_at - claims.issued_at, 3600);
    }

    #[test]
    fn reset_token_is_not_a_session() {
        let tokens = service();
        let reset = tokens
            .issue_single_purpose("a@example.com", TokenPurpose::PasswordReset, None)
            .unwrap();
        assert_eq!(tokens.verify(&reset), Err(TokenError::WrongPurpose));
        assert_eq!(
            tokens
                .verify_single_purpose(&reset, TokenPurpose::PasswordReset)
                .unwrap(),
            "a@example.com"
        );
    }

    #[test]
    fn session_is_not_a_reset_token() {
        let tokens = service();
        let session = tokens.issue_session("acct-1", "a@example.com").unwrap();
        assert_eq!(
            tokens.verify_single_purpose(&session, TokenPurpose::PasswordReset),
            Err(TokenError::WrongPurpose)
        );
    }

    #[test]
    fn expired_token_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens
            .sign(&Claims {
                sub: Some("acct-1".to_string()),
                email: "a@example.com".to_string(),
                purpose: TokenPurpose::Session,
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_rejected() {
        let other = TokenService::new(
            b"other-secret",
            Duration::from_secs(3600),
            Duration::from_secs(600),
        );
        let token = other.issue_session("acct-1", "a@example.com").unwrap();
        assert_eq!(service().verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn malformed_token_rejected() {
        assert_eq!(service().verify("not.a.token"), Err(TokenError::Invalid));
        assert_eq!(service().verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_payload_rejected() {
        let tokens = service();
        let token = tokens.issue_session("acct-1", "a@example.com").unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1].push('A');
        assert_eq!(tokens.verify(&parts.join(".")), Err(TokenError::Invalid));
    }

    #[test]
    fn huge_lifetime_saturates_instead_of_wrapping() {
        let tokens = service();
        let forever = Duration::from_secs(u64::MAX);

        let session = tokens.issue("acct-1", "a@example.com", forever).unwrap();
        let claims = tokens.verify(&session).unwrap();
        assert_eq!(claims.expires_at, i64::MAX);
        assert!(claims.expires_at > claims.issued_at);

        let reset = tokens
            .issue_single_purpose("a@example.com", TokenPurpose::PasswordReset, Some(forever))
            .unwrap();
        assert_eq!(
            tokens.verify_single_purpose(&reset, TokenPurpose::PasswordReset),
            Ok("a@example.com".to_string())
        );
    }
}
