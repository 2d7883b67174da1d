//! MyTechGear CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run schema and session-table migrations
//! mtg-cli migrate
//!
//! # Give an existing account access to the back office
//! mtg-cli role grant -e staff@mytechgear.fr
//!
//! # Take it away again
//! mtg-cli role revoke -e staff@mytechgear.fr
//!
//! # Insert the demo eyewear catalog
//! mtg-cli seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use mytechgear_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "mtg-cli")]
#[command(author, version, about = "MyTechGear CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Grant or revoke the admin role
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Seed the database with a demo catalog
    Seed,
}

#[derive(Subcommand)]
enum RoleAction {
    /// Make an existing account an admin
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin to the customer role
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Role { action } => match action {
            RoleAction::Grant { email } => commands::role::set(&email, UserRole::Admin).await,
            RoleAction::Revoke { email } => commands::role::set(&email, UserRole::Customer).await,
        },
        Commands::Seed => commands::seed::run().await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_role_grant_parses_email() {
        let cli = Cli::try_parse_from(["mtg-cli", "role", "grant", "-e", "a@b.fr"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Role { action: RoleAction::Grant { email } } if email == "a@b.fr"
        ));
    }
}
