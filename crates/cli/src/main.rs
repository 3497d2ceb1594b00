//! Catalog CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! catalog-cli migrate
//!
//! # Create the bootstrap admin user
//! catalog-cli admin create -p 'a-long-password'
//!
//! # Remove cart lines pointing at deleted products
//! catalog-cli carts prune --dry-run
//!
//! # Load products from YAML
//! catalog-cli seed products -f crates/cli/seed/products.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `carts prune` - Clean up orphaned cart lines
//! - `seed products` - Seed the catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(author, version, about = "Catalog API CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long, default_value = commands::admin::DEFAULT_ADMIN_EMAIL)]
        email: String,

        /// Admin display name
        #[arg(short, long, default_value = commands::admin::DEFAULT_ADMIN_NAME)]
        name: String,

        /// Admin password (defaults to `CATALOG_ADMIN_PASSWORD`)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Remove cart lines whose product was deleted
    Prune {
        /// Report counts without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a YAML file
    Products {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, password).await?;
            }
        },
        Commands::Carts { action } => match action {
            CartsAction::Prune { dry_run } => commands::carts::prune(dry_run).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_admin_create_defaults() {
        let cli = Cli::try_parse_from(["catalog-cli", "admin", "create"]);
        let Ok(Cli {
            command:
                Commands::Admin {
                    action: AdminAction::Create { email, name, password },
                },
        }) = cli
        else {
            panic!("admin create should parse");
        };
        assert_eq!(email, "admin@admin.com");
        assert_eq!(name, "Administrador");
        assert!(password.is_none());
    }
}
