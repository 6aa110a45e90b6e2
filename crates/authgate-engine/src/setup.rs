//! First-run bootstrap.

use authgate_core::{EngineError, User};
use rand::Rng;

use crate::LocalEngine;

/// Role granted to bootstrap administrators.
pub const ADMIN_ROLE: &str = "admin";

/// Create an admin user from `AUTHGATE_ADMIN_EMAIL` / `AUTHGATE_ADMIN_PASSWORD`
/// if the store is empty and both variables are set.
///
/// # Errors
///
/// Returns error if user creation fails.
pub fn auto_setup_from_env(engine: &LocalEngine) -> Result<Option<User>, EngineError> {
    let email = std::env::var("AUTHGATE_ADMIN_EMAIL").ok();
    let password = std::env::var("AUTHGATE_ADMIN_PASSWORD").ok();
    bootstrap_admin(engine, email.as_deref(), password.as_deref())
}

fn bootstrap_admin(
    engine: &LocalEngine,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<Option<User>, EngineError> {
    if engine.user_count() > 0 {
        return Ok(None);
    }

    let (Some(email), Some(password)) = (
        email.filter(|e| !e.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) else {
        return Ok(None);
    };

    let admin = engine.create_user(email, password, vec![ADMIN_ROLE.to_string()], true)?;

    tracing::info!(email = %admin.email, "Admin user created from environment variables");

    Ok(Some(admin))
}

/// Generate a random password.
#[must_use]
pub fn generate_password(length: usize) -> String {
    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
