//! AuthGate CLI - run and administer the auth gateway.

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{
    admin::{AdminAction, AdminArgs},
    config::ConfigAction,
    serve::ServeArgs,
    status::StatusArgs,
};

#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "AuthGate - HTTP authentication gateway")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Check whether a gateway is running
    Status {
        /// Port to probe
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// User management
    Admin {
        #[command(subcommand)]
        action: AdminCommands,

        /// Data directory override
        #[arg(long, global = true)]
        data_dir: Option<std::path::PathBuf>,
    },

    /// Show or validate configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create a new user
    Create {
        /// Email address of the new user
        #[arg(long)]
        email: String,

        /// Password (or use --generate-password)
        #[arg(long)]
        password: Option<String>,

        /// Role to grant; repeat for several
        #[arg(long = "role", default_value = "admin")]
        roles: Vec<String>,

        /// Generate a random password
        #[arg(long)]
        generate_password: bool,

        /// Leave the email address unverified
        #[arg(long)]
        unverified: bool,
    },

    /// List all users
    List,

    /// Mark a user's email address as verified
    Verify {
        /// Email address of the user
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let Some(command) = cli.command else {
        commands::run_status(StatusArgs::default()).await?;
        return Ok(());
    };

    match command {
        Commands::Serve { port, bind } => {
            commands::run_serve(ServeArgs { port, bind }).await?;
        }

        Commands::Status { port } => {
            commands::run_status(StatusArgs { port }).await?;
        }

        Commands::Admin { action, data_dir } => {
            let action = match action {
                AdminCommands::Create {
                    email,
                    password,
                    roles,
                    generate_password,
                    unverified,
                } => AdminAction::Create {
                    email,
                    password,
                    roles,
                    generate_password,
                    unverified,
                },
                AdminCommands::List => AdminAction::List,
                AdminCommands::Verify { email } => AdminAction::Verify { email },
            };
            commands::run_admin(AdminArgs { action, data_dir })?;
        }

        Commands::Config { action } => {
            let action = match action {
                Some(ConfigCommands::Validate) => ConfigAction::Validate,
                Some(ConfigCommands::Show) | None => ConfigAction::Show,
            };
            commands::run_config(action)?;
        }
    }

    Ok(())
}
