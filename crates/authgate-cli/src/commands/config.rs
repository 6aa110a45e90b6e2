//! Config show/validate command.

use std::path::Path;

use anyhow::Result;
use authgate_core::Config;

use crate::ui;

/// Config actions.
#[derive(Debug, Clone, Copy, Default)]
pub enum ConfigAction {
    /// Print the effective configuration.
    #[default]
    Show,
    /// Check the configuration file.
    Validate,
}

/// Run the config command.
pub fn run_config(action: ConfigAction) -> Result<()> {
    let path = Config::default_path();
    match action {
        ConfigAction::Show => show_config(&path),
        ConfigAction::Validate => validate_config(&path),
    }
}

/// Show the effective configuration, secret masked.
fn show_config(path: &Path) -> Result<()> {
    if path.exists() {
        ui::kv("File", &path.display().to_string());
    } else {
        ui::warning(&format!("Config file not found: {}", path.display()));
        ui::info("Showing defaults");
    }

    let mut config = Config::load_default()?.with_env_overrides();
    if config.engine.jwt_secret.is_some() {
        config.engine.jwt_secret = Some("********".to_string());
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Validate the configuration file.
fn validate_config(path: &Path) -> Result<()> {
    if !path.exists() {
        ui::info(&format!(
            "No config file at {}; defaults apply",
            path.display()
        ));
        return Ok(());
    }

    let config = Config::load(path).map_err(|e| anyhow::anyhow!("Invalid config: {e}"))?;

    ui::success(&format!("Configuration is valid: {}", path.display()));
    ui::kv("Port", &config.server.port.to_string());
    ui::kv("Mount", &config.server.mount_path);
    ui::kv("Email", ui::yes_no(config.email_enabled()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authgate.json");

        std::fs::write(&path, "{ server: { port: 9000 } }").unwrap();
        assert!(validate_config(&path).is_ok());

        std::fs::write(&path, "{ server: { mountPath: \"auth\" } }").unwrap();
        assert!(validate_config(&path).is_err());

        std::fs::write(&path, "{ not valid").unwrap();
        assert!(validate_config(&path).is_err());
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_config(&dir.path().join("missing.json")).is_ok());
    }
}
