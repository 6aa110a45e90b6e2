//! Routes added by the email capability.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use super::{RouteEntry, message};
use crate::auth::SharedEngine;
use crate::errors::{ErrorEnvelope, dispatch};
use crate::validation::{ConfirmEmailBody, ConfirmResetPasswordBody, EmailQuery, from_body, from_query};

const SEND_CONFIRMATION: &str = "/register/send-email";
const CONFIRM_EMAIL: &str = "/register/confirm-email";
const RESET_PASSWORD: &str = "/reset-password";

const SEND_RESET_FAILED: &str = "Failed to send reset password email";

pub(super) fn table() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(Method::GET, SEND_CONFIRMATION),
        RouteEntry::new(Method::POST, CONFIRM_EMAIL),
        RouteEntry::new(Method::GET, RESET_PASSWORD),
        RouteEntry::new(Method::POST, RESET_PASSWORD),
    ]
}

pub(super) fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route(SEND_CONFIRMATION, get(send_confirmation_email))
        .route(CONFIRM_EMAIL, post(confirm_email))
        .route(
            RESET_PASSWORD,
            get(send_reset_password_email).post(confirm_reset_password),
        )
        .with_state(engine)
}

async fn send_confirmation_email(State(engine): State<SharedEngine>, uri: Uri) -> Response {
    dispatch("Failed to send email confirmation", async move {
        let email = from_query::<EmailQuery>(&uri)?.into_email();
        engine.send_confirmation_email(&email).await?;
        Ok(message(StatusCode::OK, "Confirmation email sent"))
    })
    .await
}

async fn confirm_email(State(engine): State<SharedEngine>, body: Bytes) -> Response {
    dispatch("Failed to confirm email", async move {
        let (email, token) = from_body::<ConfirmEmailBody>(&body)?.into_parts();
        let outcome = engine.confirm_email(&email, &token).await?;
        Ok(Json(outcome).into_response())
    })
    .await
}

async fn send_reset_password_email(State(engine): State<SharedEngine>, uri: Uri) -> Response {
    dispatch(SEND_RESET_FAILED, async move {
        let email = from_query::<EmailQuery>(&uri)?.into_email();
        let outcome = engine.send_reset_password_email(&email).await?;

        if let Some(error) = &outcome.error {
            tracing::warn!(%email, %error, "Reset password email not sent");
        }
        if !outcome.success {
            return Ok((StatusCode::BAD_REQUEST, Json(ErrorEnvelope::new(SEND_RESET_FAILED)))
                .into_response());
        }

        Ok(message(StatusCode::OK, "Reset password email sent"))
    })
    .await
}

async fn confirm_reset_password(State(engine): State<SharedEngine>, body: Bytes) -> Response {
    dispatch("Failed to reset password", async move {
        let (email, token, password) = from_body::<ConfirmResetPasswordBody>(&body)?.into_parts();
        let outcome = engine.confirm_reset_password(&email, &token, &password).await?;
        Ok(Json(outcome).into_response())
    })
    .await
}
