//! Admin user management commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use authgate_engine::{LocalEngine, LogMailer, setup::generate_password};
use authgate_gateway::validation::{CredentialsBody, from_body};

use super::load_config;
use crate::ui;

/// Arguments for admin commands.
pub struct AdminArgs {
    /// The admin action to perform.
    pub action: AdminAction,
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
}

/// Admin actions.
pub enum AdminAction {
    /// Create a new user.
    Create {
        email: String,
        password: Option<String>,
        roles: Vec<String>,
        generate_password: bool,
        unverified: bool,
    },
    /// List all users.
    List,
    /// Mark a user's email as verified.
    Verify { email: String },
}

/// Run the admin command.
///
/// # Errors
///
/// Returns error if the store cannot be opened or the operation fails.
pub fn run_admin(args: AdminArgs) -> Result<()> {
    let mut config = load_config()?;
    if let Some(dir) = args.data_dir {
        config.engine.data_dir = Some(dir);
    }

    let engine = LocalEngine::from_config(&config, Arc::new(LogMailer)).map_err(|e| {
        anyhow::anyhow!("Failed to open user store (is the gateway running?): {e}")
    })?;

    match args.action {
        AdminAction::Create {
            email,
            password,
            roles,
            generate_password: gen_pwd,
            unverified,
        } => {
            let password = if gen_pwd {
                let pwd = generate_password(16);
                ui::success(&format!("Generated password: {pwd}"));
                pwd
            } else {
                password.ok_or_else(|| {
                    anyhow::anyhow!("Password required. Use --password or --generate-password")
                })?
            };
            create_user(&engine, &email, &password, roles, !unverified)?;
        }
        AdminAction::List => list_users(&engine)?,
        AdminAction::Verify { email } => {
            engine
                .mark_verified(&email)
                .map_err(|e| anyhow::anyhow!("Failed to verify user: {e}"))?;
            ui::success(&format!("Email verified for '{email}'"));
        }
    }

    Ok(())
}

fn create_user(
    engine: &LocalEngine,
    email: &str,
    password: &str,
    roles: Vec<String>,
    verified: bool,
) -> Result<()> {
    // Same rules as the registration route.
    let body = serde_json::json!({ "email": email, "password": password }).to_string();
    if let Err(e) = from_body::<CredentialsBody>(body.as_bytes()) {
        anyhow::bail!("{}", e.details().join(", "));
    }

    let user = engine
        .create_user(email, password, roles, verified)
        .map_err(|e| anyhow::anyhow!("Failed to create user: {e}"))?;

    ui::success(&format!(
        "Created user '{}' with roles [{}]",
        user.email,
        user.roles.join(", ")
    ));

    Ok(())
}

fn list_users(engine: &LocalEngine) -> Result<()> {
    let users = engine
        .list_users()
        .map_err(|e| anyhow::anyhow!("Failed to list users: {e}"))?;

    if users.is_empty() {
        ui::info("No users configured.");
        ui::info("Run 'authgate admin create --email <EMAIL> --generate-password' to create an admin user.");
        return Ok(());
    }

    ui::info(&format!("Users ({}):", users.len()));
    println!();
    println!("{:<30} {:<20} {:<9} {:<20}", "EMAIL", "ROLES", "VERIFIED", "CREATED");
    println!("{}", "-".repeat(80));

    for user in users {
        println!(
            "{:<30} {:<20} {:<9} {:<20}",
            user.email,
            user.roles.join(","),
            ui::yes_no(user.email_verified),
            user.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}
