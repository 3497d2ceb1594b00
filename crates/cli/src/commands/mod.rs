//! CLI subcommand implementations.

pub mod admin;
pub mod carts;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;

use catalog_api::{config, db};

/// Load `.env` and connect to the catalog database.
///
/// # Errors
///
/// Returns an error if no database URL is configured or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let database_url = config::database_url()?;

    tracing::info!("Connecting to catalog database...");
    Ok(db::create_pool(&database_url).await?)
}
