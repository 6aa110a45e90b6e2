//! Serve command - run the auth gateway.

use std::sync::Arc;

use anyhow::Result;
use authgate_engine::{LocalEngine, LogMailer, setup::auto_setup_from_env};
use authgate_gateway::RouteCapability;

use super::load_config;
use crate::ui;

/// Serve command arguments.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port override.
    pub port: Option<u16>,
    /// Bind address override.
    pub bind: Option<String>,
}

/// Run the gateway until Ctrl-C.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    config.validate()?;

    let engine = LocalEngine::from_config(&config, Arc::new(LogMailer))?;

    match auto_setup_from_env(&engine) {
        Ok(Some(admin)) => ui::success(&format!("Created admin user '{}'", admin.email)),
        Ok(None) => {}
        Err(e) => tracing::warn!("Auto-setup from env failed: {}", e),
    }
    if engine.user_count() == 0 {
        ui::warning("No users yet");
        ui::info("Create an admin with: authgate admin create --email <EMAIL> --generate-password");
    }

    let capability = RouteCapability::from_email_enabled(engine.email_enabled());
    let mount = config.server.mount_path.trim_end_matches('/');

    ui::header("Starting AuthGate");
    ui::kv(
        "Address",
        &format!("{}:{}", config.server.bind_address, config.server.port),
    );
    ui::kv("Data", &config.data_dir().display().to_string());
    ui::kv("Capability", &capability.to_string());
    for route in capability.route_table() {
        println!("    {:<6} {mount}{}", route.method.as_str(), route.path);
    }
    println!();
    ui::info("Press Ctrl+C to stop");

    authgate_gateway::start(config.server, Arc::new(engine), capability).await?;

    Ok(())
}
