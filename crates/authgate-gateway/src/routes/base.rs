//! Routes available on every engine.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::post,
};

use authgate_core::EngineError;

use super::{RouteEntry, message};
use crate::auth::{RequireSession, RoleGuard, SharedEngine, require_roles, require_session};
use crate::errors::dispatch;
use crate::validation::{CredentialsBody, RefreshTokenBody, RevokeTargetBody, from_body};

const REGISTER: &str = "/register";
const LOGIN: &str = "/login";
const REFRESH_TOKEN: &str = "/refresh-token";
const REVOKE_REFRESH_TOKEN: &str = "/refresh-token/revoke";

/// Claims requested on login.
const LOGIN_CLAIMS: &[&str] = &["roles"];

pub(super) fn table() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(Method::POST, REGISTER),
        RouteEntry::new(Method::POST, LOGIN),
        RouteEntry::new(Method::POST, REFRESH_TOKEN),
        RouteEntry::new(Method::POST, REVOKE_REFRESH_TOKEN),
    ]
}

pub(super) fn router(engine: SharedEngine) -> Router {
    // Layers run bottom-up: verification first, then the role guard.
    let revoke = post(revoke_refresh_token)
        .route_layer(from_fn_with_state(RoleGuard::admin(), require_roles))
        .route_layer(from_fn_with_state(engine.clone(), require_session));

    Router::new()
        .route(REGISTER, post(register))
        .route(LOGIN, post(login))
        .route(REFRESH_TOKEN, post(refresh_token))
        .route(REVOKE_REFRESH_TOKEN, revoke)
        .with_state(engine)
}

async fn register(State(engine): State<SharedEngine>, body: Bytes) -> Response {
    dispatch("Failed to register user", async move {
        let credentials = from_body::<CredentialsBody>(&body)?.into_credentials();
        let user = engine.register(credentials).await?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(message(StatusCode::CREATED, "Registration successful"))
    })
    .await
}

async fn login(State(engine): State<SharedEngine>, body: Bytes) -> Response {
    dispatch("Failed to login", async move {
        let credentials = from_body::<CredentialsBody>(&body)?.into_credentials();
        let pair = engine.login(credentials, LOGIN_CLAIMS).await?;
        Ok(Json(pair).into_response())
    })
    .await
}

async fn refresh_token(State(engine): State<SharedEngine>, body: Bytes) -> Response {
    dispatch("Failed to refresh access token", async move {
        let (access_token, refresh_token) = from_body::<RefreshTokenBody>(&body)?.into_pair();
        let pair = engine.refresh_token(&access_token, &refresh_token).await?;
        Ok(Json(pair).into_response())
    })
    .await
}

async fn revoke_refresh_token(
    State(engine): State<SharedEngine>,
    RequireSession(session): RequireSession,
    body: Bytes,
) -> Response {
    dispatch("Failed to revoke refresh token", async move {
        let target = from_body::<RevokeTargetBody>(&body)?.into_lookup();
        let user = engine
            .get_user(&target)
            .await?
            .ok_or_else(|| EngineError::InvalidUser(target.to_string()))?;

        engine.revoke_refresh_token(&user.id).await?;

        tracing::info!(
            admin = %session.subject_id(),
            user_id = %user.id,
            "Revoked refresh token"
        );
        Ok(message(StatusCode::OK, "Refresh token revoked"))
    })
    .await
}
