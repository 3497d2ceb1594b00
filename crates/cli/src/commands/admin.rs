//! Admin user management commands.
//!
//! Admin accounts cannot be created through the public registration
//! endpoint; this command is the only way to get one.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap the default admin (admin@admin.com)
//! catalog-cli admin create -p 'a-long-password'
//!
//! # Create a named admin
//! catalog-cli admin create -e ops@example.com -n "Ops Team" -p 'a-long-password'
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `CATALOG_ADMIN_PASSWORD` - Password used when `-p` is omitted

use catalog_api::db::{RepositoryError, UserRepository};
use catalog_api::services::auth::hash_password;
use catalog_core::{Email, Role, UserId};
use thiserror::Error;

/// Email of the bootstrap admin account.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@admin.com";

/// Display name of the bootstrap admin account.
pub const DEFAULT_ADMIN_NAME: &str = "Administrador";

/// Shortest accepted admin password.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No password given on the command line or in the environment.
    #[error("Missing password: pass -p or set CATALOG_ADMIN_PASSWORD")]
    MissingPassword,

    /// Password too short.
    #[error("Password must be at least 8 characters")]
    WeakPassword,

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("A user already exists with email: {0}")]
    UserExists(String),

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `password` - Admin's password, or `None` to read `CATALOG_ADMIN_PASSWORD`
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns `AdminError` if validation fails, the email is taken, or the
/// database is unreachable.
pub async fn create_user(
    email: &str,
    name: &str,
    password: Option<String>,
) -> Result<UserId, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    let password = password
        .or_else(|| std::env::var("CATALOG_ADMIN_PASSWORD").ok())
        .ok_or(AdminError::MissingPassword)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }

    let pool = super::connect()
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating admin user: {}", email);

    let password_hash = hash_password(&password).map_err(|_| AdminError::PasswordHash)?;
    let user = users
        .create(name.trim(), &email, &password_hash, Role::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Database(other.to_string()),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}
