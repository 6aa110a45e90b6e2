//! CLI command implementations.

pub mod admin;
pub mod config;
pub mod serve;
pub mod status;

pub use admin::run_admin;
pub use config::run_config;
pub use serve::run_serve;
pub use status::run_status;

use anyhow::Result;
use authgate_core::Config;

use crate::ui;

/// Load the configuration file with environment overrides, falling back to
/// defaults when no file exists.
pub(crate) fn load_config() -> Result<Config> {
    let path = Config::default_path();
    if !path.exists() {
        ui::warning(&format!(
            "No configuration found at {}, using defaults",
            path.display()
        ));
    }

    Ok(Config::load_default()?.with_env_overrides())
}
