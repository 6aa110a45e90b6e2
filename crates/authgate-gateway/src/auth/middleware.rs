//! Bearer token verification for axum.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use authgate_core::{AuthEngine, Session};

use crate::errors::AuthRejection;

/// Engine handle shared by every route.
pub type SharedEngine = Arc<dyn AuthEngine>;

/// The bearer token of an `Authorization` header, or `""` when the header
/// is missing or not a bearer credential.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .unwrap_or_default()
}

/// Verify the bearer token in `headers` and build the caller's session.
///
/// # Errors
///
/// Returns [`AuthRejection::Unauthorized`] if the engine rejects the token
/// or reports no payload.
pub fn authenticate(engine: &dyn AuthEngine, headers: &HeaderMap) -> Result<Session, AuthRejection> {
    match engine.verify_access_token(bearer_token(headers)) {
        Ok(Some(decoded)) => Ok(Session::from_token(decoded)),
        Ok(None) => {
            tracing::debug!("Access token rejected without payload");
            Err(AuthRejection::Unauthorized)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Access token rejected");
            Err(AuthRejection::Unauthorized)
        }
    }
}

/// Middleware that rejects unauthenticated requests with 401 and attaches
/// the verified [`Session`] for later stages.
///
/// Install with `axum::middleware::from_fn_with_state(engine, require_session)`.
pub async fn require_session(
    State(engine): State<SharedEngine>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(engine.as_ref(), request.headers()) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Extractor for authenticated requests.
///
/// Reuses the session attached by [`require_session`] when present and
/// verifies the bearer token otherwise.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl RequireSession {
    /// Subject (user ID) of the caller.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        self.0.subject_id()
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
    SharedEngine: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Self(session.clone()));
        }

        let engine = SharedEngine::from_ref(state);
        let session = authenticate(engine.as_ref(), &parts.headers)?;
        parts.extensions.insert(session.clone());
        Ok(Self(session))
    }
}
