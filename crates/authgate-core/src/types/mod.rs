//! Core types shared between the gateway and authentication engines.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Email and password pair submitted to `register` and `login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email address.
    pub email: String,
    /// Plaintext password. Only engines ever see this.
    pub password: String,
}

impl Credentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Custom claims carried under the `data` key of an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// Roles granted to the subject.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Decoded payload of a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedToken {
    /// Subject (user ID).
    pub sub: String,
    /// Custom claims.
    #[serde(default)]
    pub data: TokenData,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Access and refresh tokens returned by `login` and `refresh_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Signed, short-lived access token.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
}

/// The caller identity attached to a request after its bearer token verified.
///
/// A `Session` only ever comes from [`Session::from_token`], so holding one
/// means verification already succeeded for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    subject_id: String,
    roles: BTreeSet<String>,
}

impl Session {
    /// Build a session from a verified token payload.
    #[must_use]
    pub fn from_token(token: DecodedToken) -> Self {
        Self {
            subject_id: token.sub,
            roles: token.data.roles.into_iter().collect(),
        }
    }

    /// Subject (user ID) of the verified token.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Roles carried by the verified token.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether the session holds at least one of `required`.
    #[must_use]
    pub fn has_any_role(&self, required: &BTreeSet<String>) -> bool {
        !self.roles.is_disjoint(required)
    }
}

/// User record as exposed by an engine's repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Email address used to log in.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<String>,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Partial identity used to look a user up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLookup {
    /// Look up by user ID.
    Id(String),
    /// Look up by email address.
    Email(String),
}

impl fmt::Display for UserLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id: {id}"),
            Self::Email(email) => write!(f, "email: {email}"),
        }
    }
}

/// Result reported by the email capability operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailOutcome {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Engine-side error detail. Logged by the gateway, never returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed outcome carrying an error detail.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
