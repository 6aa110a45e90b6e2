//! Gateway server.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use authgate_core::ServerConfig;

use crate::GatewayError;
use crate::auth::SharedEngine;
use crate::routes::{RouteCapability, auth_router};

/// Gateway server.
pub struct Gateway {
    config: ServerConfig,
    engine: SharedEngine,
    capability: RouteCapability,
}

/// Builder for constructing a Gateway with its engine.
pub struct GatewayBuilder {
    config: ServerConfig,
    engine: Option<SharedEngine>,
    capability: RouteCapability,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            engine: None,
            capability: RouteCapability::Base,
        }
    }

    /// Set server configuration.
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the authentication engine.
    #[must_use]
    pub fn with_engine(mut self, engine: SharedEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set which auth route groups are mounted.
    #[must_use]
    pub fn with_capability(mut self, capability: RouteCapability) -> Self {
        self.capability = capability;
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if no engine is set or the mount path is invalid.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let engine = self
            .engine
            .ok_or_else(|| GatewayError::Config("Auth engine is required".to_string()))?;

        if !self.config.mount_path.starts_with('/') {
            return Err(GatewayError::Config(format!(
                "Mount path must start with '/': {}",
                self.config.mount_path
            )));
        }

        Ok(Gateway {
            config: self.config,
            engine,
            capability: self.capability,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// Start building a gateway.
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Mounted auth capability.
    #[must_use]
    pub const fn capability(&self) -> RouteCapability {
        self.capability
    }

    /// Build the HTTP application: `/health` plus the auth routes under the
    /// configured mount path.
    pub fn app(&self) -> Router {
        let health = Router::new()
            .route("/health", get(health_handler))
            .with_state(self.capability);

        let auth = auth_router(self.engine.clone(), self.capability);
        let mount = self.config.mount_path.trim_end_matches('/');

        let app = if mount.is_empty() {
            health.merge(auth)
        } else {
            health.nest(mount, auth)
        };

        let app = app.layer(TraceLayer::new_for_http());
        if self.config.cors {
            app.layer(CorsLayer::permissive())
        } else {
            app
        }
    }

    /// Run the gateway server until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or the listener fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns error if the server fails.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            capability = %self.capability,
            mount = %self.config.mount_path,
            "Gateway listening on http://{}",
            listener.local_addr()?
        );

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

async fn health_handler(State(capability): State<RouteCapability>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "capability": capability.to_string(),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
