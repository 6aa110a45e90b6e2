//! # AuthGate Gateway
//!
//! HTTP front for an [`AuthEngine`](authgate_core::AuthEngine): bearer token
//! verification, role guards, normalized error envelopes and the auth route
//! table, plus a small server runner.
//!
//! ```no_run
//! # async fn example(engine: authgate_gateway::SharedEngine) {
//! use authgate_gateway::{RouteCapability, auth_router};
//!
//! let app = axum::Router::new().nest("/auth", auth_router(engine, RouteCapability::Base));
//! # let _ = app;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Token verification and role guards.
pub mod auth;
/// Error envelope and normalization.
pub mod errors;
mod routes;
mod server;
/// Request schemas.
pub mod validation;

pub use auth::{
    ADMIN_ROLE, RequireSession, RoleGuard, SharedEngine, authenticate, bearer_token,
    require_roles, require_session,
};
pub use errors::{AuthRejection, ErrorEnvelope, HandlerError};
pub use routes::{RouteCapability, RouteEntry, auth_router};
pub use server::{Gateway, GatewayBuilder};
pub use validation::SchemaError;

use authgate_core::ServerConfig;

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(
    config: ServerConfig,
    engine: SharedEngine,
    capability: RouteCapability,
) -> Result<(), GatewayError> {
    let gateway = GatewayBuilder::new()
        .with_config(config)
        .with_engine(engine)
        .with_capability(capability)
        .build()?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
