//! Refresh token and email token bookkeeping.

use std::time::Duration;

use authgate_core::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jwt::TokenIssuer;

/// What an email token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTokenPurpose {
    /// Confirm ownership of the address.
    ConfirmEmail,
    /// Set a new password.
    ResetPassword,
}

impl EmailTokenPurpose {
    fn prefix(self) -> &'static str {
        match self {
            Self::ConfirmEmail => "confirm",
            Self::ResetPassword => "reset",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Token store backed by sled. One live refresh token per user and one live
/// email token per (purpose, address); issuing a new one replaces the old.
pub struct TokenStore {
    refresh: sled::Tree,
    email: sled::Tree,
}

impl TokenStore {
    /// Open the token trees of an existing database.
    ///
    /// # Errors
    ///
    /// Returns error if a tree cannot be opened.
    pub fn open(db: &sled::Db) -> Result<Self, EngineError> {
        let refresh = db
            .open_tree("refresh_tokens")
            .map_err(|e| EngineError::Storage(format!("Failed to open refresh tree: {e}")))?;
        let email = db
            .open_tree("email_tokens")
            .map_err(|e| EngineError::Storage(format!("Failed to open email token tree: {e}")))?;

        Ok(Self { refresh, email })
    }

    /// Issue a refresh token for `user_id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn issue_refresh(&self, user_id: &str, ttl: Duration) -> Result<String, EngineError> {
        let token = TokenIssuer::random_token();
        put(&self.refresh, user_id, &token, ttl)?;
        Ok(token)
    }

    /// Exchange `token` for a new refresh token for `user_id`.
    ///
    /// The stored value is swapped atomically, so of several callers
    /// presenting the same token only one receives a successor.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRefreshToken`] if there is no token on
    /// record, it differs or it was rotated concurrently, and
    /// [`EngineError::RefreshTokenExpired`] if it expired.
    pub fn rotate_refresh(
        &self,
        user_id: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<String, EngineError> {
        let raw = self
            .refresh
            .get(user_id.as_bytes())
            .map_err(|e| EngineError::Storage(format!("Get error: {e}")))?
            .ok_or(EngineError::InvalidRefreshToken)?;

        let stored = decode(&raw)?;
        if stored.token != token {
            return Err(EngineError::InvalidRefreshToken);
        }
        if stored.expires_at <= Utc::now() {
            return Err(EngineError::RefreshTokenExpired);
        }

        let next = TokenIssuer::random_token();
        self.refresh
            .compare_and_swap(user_id.as_bytes(), Some(raw), Some(encode(&next, ttl)?))
            .map_err(|e| EngineError::Storage(format!("Swap error: {e}")))?
            .map_err(|_| EngineError::InvalidRefreshToken)?;
        flush(&self.refresh)?;

        Ok(next)
    }

    /// Remove the refresh token of `user_id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn revoke_refresh(&self, user_id: &str) -> Result<bool, EngineError> {
        let removed = self
            .refresh
            .remove(user_id.as_bytes())
            .map_err(|e| EngineError::Storage(format!("Delete error: {e}")))?
            .is_some();
        Ok(removed)
    }

    /// Issue an email token, replacing any previous one for the same purpose and address.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn issue_email_token(
        &self,
        purpose: EmailTokenPurpose,
        email: &str,
        ttl: Duration,
    ) -> Result<String, EngineError> {
        let token = TokenIssuer::random_token();
        put(&self.email, &email_key(purpose, email), &token, ttl)?;
        Ok(token)
    }

    /// Consume an email token. A token can be used once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidEmailToken`] if the token is unknown,
    /// superseded, expired or already used.
    pub fn consume_email_token(
        &self,
        purpose: EmailTokenPurpose,
        email: &str,
        token: &str,
    ) -> Result<(), EngineError> {
        let key = email_key(purpose, email);
        let raw = self
            .email
            .get(key.as_bytes())
            .map_err(|e| EngineError::Storage(format!("Get error: {e}")))?
            .ok_or(EngineError::InvalidEmailToken)?;

        let stored = decode(&raw)?;
        if stored.token != token || stored.expires_at <= Utc::now() {
            return Err(EngineError::InvalidEmailToken);
        }

        // Only the caller that removes the exact value we read wins.
        self.email
            .compare_and_swap(key.as_bytes(), Some(raw), None as Option<&[u8]>)
            .map_err(|e| EngineError::Storage(format!("Delete error: {e}")))?
            .map_err(|_| EngineError::InvalidEmailToken)
    }
}

fn email_key(purpose: EmailTokenPurpose, email: &str) -> String {
    format!("{}:{email}", purpose.prefix())
}

fn encode(token: &str, ttl: Duration) -> Result<Vec<u8>, EngineError> {
    let stored = StoredToken {
        token: token.to_string(),
        expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
    };
    serde_json::to_vec(&stored)
        .map_err(|e| EngineError::Storage(format!("Serialization error: {e}")))
}

fn decode(raw: &[u8]) -> Result<StoredToken, EngineError> {
    serde_json::from_slice(raw)
        .map_err(|e| EngineError::Storage(format!("Deserialization error: {e}")))
}

fn put(tree: &sled::Tree, key: &str, token: &str, ttl: Duration) -> Result<(), EngineError> {
    tree.insert(key.as_bytes(), encode(token, ttl)?)
        .map_err(|e| EngineError::Storage(format!("Insert error: {e}")))?;
    flush(tree)
}

fn flush(tree: &sled::Tree) -> Result<(), EngineError> {
    tree.flush()
        .map_err(|e| EngineError::Storage(format!("Flush error: {e}")))?;
    Ok(())
}
