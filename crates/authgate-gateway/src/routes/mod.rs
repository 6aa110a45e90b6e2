//! Auth route composition.
//!
//! The route set is fixed when the router is built: the base group is always
//! mounted and the email group is merged in once when the engine offers the
//! email capability.

mod base;
mod email;

use std::fmt;

use axum::{
    Json, Router,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::SharedEngine;

/// Which route groups an auth router exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteCapability {
    /// Register, login, refresh and revoke.
    #[default]
    Base,
    /// The base routes plus email confirmation and password reset.
    EmailConfirmation,
}

impl RouteCapability {
    /// Capability for an engine with or without email support.
    #[must_use]
    pub const fn from_email_enabled(enabled: bool) -> Self {
        if enabled {
            Self::EmailConfirmation
        } else {
            Self::Base
        }
    }

    /// Whether the email routes are mounted.
    #[must_use]
    pub const fn has_email(self) -> bool {
        matches!(self, Self::EmailConfirmation)
    }

    /// Every route mounted for this capability, relative to the mount path.
    #[must_use]
    pub fn route_table(self) -> Vec<RouteEntry> {
        let mut routes = base::table();
        if self.has_email() {
            routes.extend(email::table());
        }
        routes
    }
}

impl fmt::Display for RouteCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::EmailConfirmation => write!(f, "email"),
        }
    }
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the mount path.
    pub path: &'static str,
}

impl RouteEntry {
    const fn new(method: Method, path: &'static str) -> Self {
        Self { method, path }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Build the auth router for `capability`. Nest it under a mount path of
/// the host's choosing.
pub fn auth_router(engine: SharedEngine, capability: RouteCapability) -> Router {
    let router = base::router(engine.clone());
    let router = match capability {
        RouteCapability::Base => router,
        RouteCapability::EmailConfirmation => router.merge(email::router(engine)),
    };

    tracing::debug!(
        %capability,
        routes = capability.route_table().len(),
        "Auth routes composed"
    );
    router
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}
