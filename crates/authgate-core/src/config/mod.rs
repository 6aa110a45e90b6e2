//! Configuration loading and validation.
//!
//! Supports JSON5 format. Config location: `~/.authgate/authgate.json`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Reference engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Email capability. Its presence enables the email routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("authgate.json")
    }

    /// Get the AuthGate state directory.
    ///
    /// Uses `AUTHGATE_STATE_DIR` env var if set, otherwise `~/.authgate`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("AUTHGATE_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".authgate")
        } else {
            PathBuf::from(".authgate")
        }
    }

    /// Directory holding the reference engine's database.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.engine
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("data"))
    }

    /// Whether the email capability is configured.
    #[must_use]
    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    /// Apply environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var("AUTHGATE_JWT_SECRET") {
            self.engine.jwt_secret = Some(secret);
        }

        if let Some(port) = std::env::var("AUTHGATE_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        if !self.server.mount_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Mount path must start with '/': {}",
                self.server.mount_path
            )));
        }

        if self.engine.access_token_minutes == 0 || self.engine.refresh_token_days == 0 {
            return Err(ConfigError::Validation(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        if let Some(email) = &self.email {
            if email.sender_email.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Email sender address cannot be empty".to_string(),
                ));
            }
            if email.token_expiry_minutes == 0 {
                return Err(ConfigError::Validation(
                    "Email token expiry must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}

const fn default_port() -> u16 {
    18790
}

const fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_mount_path() -> String {
    "/auth".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Path the auth routes are nested under.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            cors: true,
            mount_path: default_mount_path(),
        }
    }
}

const fn default_access_minutes() -> u64 {
    15
}

const fn default_refresh_days() -> u64 {
    7
}

fn default_roles() -> Vec<String> {
    vec!["user".to_string()]
}

/// Reference engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Database directory. Defaults to `<state dir>/data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// JWT secret (hex-encoded). Generated on startup if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in minutes.
    #[serde(default = "default_access_minutes")]
    pub access_token_minutes: u64,

    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_days")]
    pub refresh_token_days: u64,

    /// Roles granted to newly registered users.
    #[serde(default = "default_roles")]
    pub default_roles: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            jwt_secret: None,
            access_token_minutes: default_access_minutes(),
            refresh_token_days: default_refresh_days(),
            default_roles: default_roles(),
        }
    }
}

impl EngineConfig {
    /// Access token lifetime.
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_minutes * 60)
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_days * 24 * 3600)
    }
}

const fn default_email_token_minutes() -> u64 {
    60
}

/// Email capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    /// Display name on outgoing mail.
    pub sender_name: String,

    /// From address on outgoing mail.
    pub sender_email: String,

    /// Base URL of the email confirmation page. `email` and `token` are appended as query parameters.
    pub confirm_email_url: String,

    /// Base URL of the password reset page. `email` and `token` are appended as query parameters.
    pub reset_password_url: String,

    /// Lifetime of confirmation and reset tokens in minutes.
    #[serde(default = "default_email_token_minutes")]
    pub token_expiry_minutes: u64,
}

impl EmailConfig {
    /// Lifetime of confirmation and reset tokens.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_expiry_minutes * 60)
    }
}
