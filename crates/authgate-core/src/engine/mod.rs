//! The authentication engine contract.
//!
//! The gateway never hashes passwords, signs tokens or sends mail itself; it
//! dispatches every operation to an [`AuthEngine`]. One trait carries the
//! whole superset of operations. The email operations have default bodies
//! returning [`EngineError::CapabilityDisabled`] and are only called from the
//! email route group.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Credentials, DecodedToken, EmailOutcome, TokenPair, User, UserLookup};

/// Engine errors.
///
/// Domain errors carry caller-facing messages and are returned verbatim by
/// the gateway. Everything else is reported with a generic message.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An account with this email already exists.
    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Login attempted before the email address was confirmed.
    #[error("Email not verified: {0}")]
    EmailNotVerified(String),

    /// Confirmation requested for an address that is already confirmed.
    #[error("Email already verified: {0}")]
    EmailAlreadyVerified(String),

    /// Lookup matched no user.
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    /// Access token is malformed, tampered with or expired.
    #[error("Invalid access token: {0}")]
    InvalidAccessToken(String),

    /// Refresh token does not match the one on record.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh token is past its expiry.
    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// Email confirmation or password reset token is unknown or expired.
    #[error("Invalid or expired token")]
    InvalidEmailToken,

    /// Email delivery failed.
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// The engine was built without the email capability.
    #[error("Email capability is not configured")]
    CapabilityDisabled,

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Any other internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this is a domain error whose message is safe to return to callers.
    #[must_use]
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            Self::CapabilityDisabled | Self::Storage(_) | Self::Internal(_)
        )
    }
}

/// Operations the gateway dispatches to.
#[async_trait]
pub trait AuthEngine: Send + Sync {
    /// Create an account.
    async fn register(&self, credentials: Credentials) -> Result<User, EngineError>;

    /// Authenticate and issue a token pair. `claims` names the user fields to
    /// embed in the access token (the gateway asks for `roles`).
    async fn login(
        &self,
        credentials: Credentials,
        claims: &[&str],
    ) -> Result<TokenPair, EngineError>;

    /// Exchange a (possibly expired) access token and its refresh token for a new pair.
    async fn refresh_token(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, EngineError>;

    /// Invalidate the refresh token held by `subject_id`.
    async fn revoke_refresh_token(&self, subject_id: &str) -> Result<(), EngineError>;

    /// Verify an access token.
    ///
    /// Returns `Ok(None)` or an error when the token must not be trusted.
    fn verify_access_token(&self, token: &str) -> Result<Option<DecodedToken>, EngineError>;

    /// Look a user up by partial identity.
    async fn get_user(&self, lookup: &UserLookup) -> Result<Option<User>, EngineError>;

    /// Send (or resend) the email confirmation message.
    async fn send_confirmation_email(&self, _email: &str) -> Result<(), EngineError> {
        Err(EngineError::CapabilityDisabled)
    }

    /// Confirm an email address with the token that was mailed to it.
    async fn confirm_email(&self, _email: &str, _token: &str) -> Result<EmailOutcome, EngineError> {
        Err(EngineError::CapabilityDisabled)
    }

    /// Send a password reset message.
    async fn send_reset_password_email(&self, _email: &str) -> Result<EmailOutcome, EngineError> {
        Err(EngineError::CapabilityDisabled)
    }

    /// Set a new password using a reset token.
    async fn confirm_reset_password(
        &self,
        _email: &str,
        _token: &str,
        _password: &str,
    ) -> Result<EmailOutcome, EngineError> {
        Err(EngineError::CapabilityDisabled)
    }
}
