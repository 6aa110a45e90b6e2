//! Error envelope and normalization.
//!
//! Handler failures never escape as 5xx: schema failures and engine domain
//! errors are reported to the client, everything else collapses to the
//! route's default message and is logged.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use authgate_core::EngineError;

use crate::validation::{INVALID_PARAMETERS, SchemaError};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable message.
    pub error: String,
    /// Per-field validation messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorEnvelope {
    /// An envelope without details.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// An envelope with per-field details.
    #[must_use]
    pub fn with_details(error: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

/// Anything a route handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Request input failed its schema.
    #[error(transparent)]
    Validation(#[from] SchemaError),

    /// The engine rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl HandlerError {
    /// Map this failure to the client-facing envelope. Always a 400.
    ///
    /// Failures that are neither schema nor engine domain errors are logged
    /// and replaced by `default_message`.
    #[must_use]
    pub fn normalize(self, default_message: &str) -> (StatusCode, ErrorEnvelope) {
        let envelope = match self {
            Self::Validation(err) => {
                tracing::debug!(error = %err, "Request failed validation");
                ErrorEnvelope::with_details(INVALID_PARAMETERS, err.into_details())
            }
            Self::Engine(err) if err.is_domain() => {
                tracing::debug!(error = %err, "Engine rejected request");
                ErrorEnvelope::new(err.to_string())
            }
            Self::Engine(err) => {
                tracing::error!(error = %err, "{default_message}");
                ErrorEnvelope::new(default_message)
            }
        };

        (StatusCode::BAD_REQUEST, envelope)
    }
}

/// Run a handler body and normalize its failure with `default_message`.
pub(crate) async fn dispatch<F>(default_message: &'static str, handler: F) -> Response
where
    F: Future<Output = Result<Response, HandlerError>>,
{
    match handler.await {
        Ok(response) => response,
        Err(err) => {
            let (status, envelope) = err.normalize(default_message);
            (status, Json(envelope)).into_response()
        }
    }
}

/// Authentication and authorization rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    /// Missing, malformed or rejected bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Verified caller lacks every required role.
    #[error("Forbidden")]
    Forbidden,
}

impl AuthRejection {
    /// HTTP status of this rejection.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorEnvelope::new(self.to_string()))).into_response()
    }
}
