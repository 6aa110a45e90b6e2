//! Role-based authorization.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use authgate_core::Session;

use crate::errors::AuthRejection;

/// Role required by administrative routes.
pub const ADMIN_ROLE: &str = "admin";

/// Required-role set fixed when a route is registered.
///
/// A caller passes if its session holds at least one of the required roles.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    required: Arc<BTreeSet<String>>,
}

impl RoleGuard {
    /// Guard requiring any of `roles`.
    #[must_use]
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: Arc::new(roles.into_iter().map(Into::into).collect()),
        }
    }

    /// Guard requiring the `admin` role.
    #[must_use]
    pub fn admin() -> Self {
        Self::new([ADMIN_ROLE])
    }

    /// The required roles.
    #[must_use]
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Authorize a request's session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthRejection::Forbidden`] if there is no session or it
    /// holds none of the required roles.
    pub fn check(&self, session: Option<&Session>) -> Result<(), AuthRejection> {
        match session {
            Some(session) if session.has_any_role(&self.required) => Ok(()),
            Some(session) => {
                tracing::debug!(
                    subject = %session.subject_id(),
                    required = ?self.required,
                    "Missing required role"
                );
                Err(AuthRejection::Forbidden)
            }
            None => Err(AuthRejection::Forbidden),
        }
    }
}

/// Middleware enforcing a [`RoleGuard`] against the attached [`Session`].
///
/// Install after [`require_session`](super::require_session) with
/// `axum::middleware::from_fn_with_state(guard, require_roles)`.
pub async fn require_roles(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Response {
    match guard.check(request.extensions().get::<Session>()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}
