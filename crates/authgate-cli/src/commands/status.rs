//! Status command - probe a running gateway.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use anyhow::Result;
use authgate_core::Config;

use crate::ui::{self, HealthStatus};

/// Status command arguments.
#[derive(Debug, Clone, Default)]
pub struct StatusArgs {
    /// Port override.
    pub port: Option<u16>,
}

/// Run the status command.
pub async fn run_status(args: StatusArgs) -> Result<()> {
    ui::header("AuthGate Status");

    let config = Config::load_default().map(Config::with_env_overrides);
    let port = args
        .port
        .or_else(|| config.as_ref().ok().map(|c| c.server.port))
        .unwrap_or(18790);
    let bind = config
        .as_ref()
        .map_or("127.0.0.1", |c| c.server.bind_address.as_str());
    let url = health_url(bind, port);

    println!();
    ui::info("Gateway");
    let client = reqwest::Client::new();
    match client
        .get(&url)
        .timeout(Duration::from_secs(2))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            ui::health_check("Status", HealthStatus::Ok, Some("running"));
            ui::kv("  URL", &url);
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                for key in ["version", "capability"] {
                    if let Some(value) = body.get(key).and_then(|v| v.as_str()) {
                        ui::kv(&format!("  {key}"), value);
                    }
                }
            }
        }
        Ok(resp) => {
            ui::health_check(
                "Status",
                HealthStatus::Error,
                Some(&format!("health check returned {}", resp.status())),
            );
        }
        Err(_) => {
            ui::health_check("Status", HealthStatus::Warning, Some("not running"));
            ui::info("  Start with: authgate serve");
        }
    }

    println!();
    ui::info("Configuration");
    match config {
        Ok(config) => {
            ui::health_check("Config", HealthStatus::Ok, Some("loaded"));
            ui::kv("  Path", &Config::default_path().display().to_string());
            ui::kv("  Email", ui::yes_no(config.email_enabled()));
        }
        Err(e) => ui::health_check("Config", HealthStatus::Error, Some(&e.to_string())),
    }

    Ok(())
}

/// Health endpoint of a gateway bound to `bind`. Wildcard binds are probed
/// on loopback.
fn health_url(bind: &str, port: u16) -> String {
    let host = match bind.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST).to_string(),
        Ok(IpAddr::V6(ip)) if ip.is_unspecified() => format!("[{}]", Ipv6Addr::LOCALHOST),
        Ok(IpAddr::V6(ip)) => format!("[{ip}]"),
        Ok(IpAddr::V4(ip)) => ip.to_string(),
        Err(_) => bind.to_string(),
    };
    format!("http://{host}:{port}/health")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url_follows_bind_address() {
        assert_eq!(health_url("127.0.0.1", 18790), "http://127.0.0.1:18790/health");
        assert_eq!(health_url("10.0.0.5", 8080), "http://10.0.0.5:8080/health");
        assert_eq!(health_url("gateway.local", 80), "http://gateway.local:80/health");
        assert_eq!(health_url("::1", 80), "http://[::1]:80/health");
    }

    #[test]
    fn test_wildcard_bind_probes_loopback() {
        assert_eq!(health_url("0.0.0.0", 18790), "http://127.0.0.1:18790/health");
        assert_eq!(health_url("::", 18790), "http://[::1]:18790/health");
    }
}
