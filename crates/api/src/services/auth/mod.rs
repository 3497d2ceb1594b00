//! Authentication service.
//!
//! Password registration and login, plus the bearer tokens handed out at
//! login and checked by the auth extractors.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenService};

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use catalog_core::{Email, Role};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Password length bounds, in characters.
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 32;

/// Longest email accepted at registration.
const MAX_EMAIL_LENGTH: usize = 100;

/// Letters (including Spanish accented vowels and ñ) and spaces.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÁÉÍÓÚáéíóúñÑ ]{2,50}$").expect("Invalid regex"));

/// Body of `POST /auth/registro`.
#[derive(Debug, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub name: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a customer account.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of `AuthError` for bad input,
    /// `AuthError::AdminSelfRegistration` when `role` is `admin`, and
    /// `AuthError::EmailTaken` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let name = validate_name(&registration.name)?;
        let email = validate_email(&registration.email)?;
        validate_password(&registration.password)?;
        let role = registration_role(registration.role.as_deref())?;

        let password_hash = hash_password(&registration.password)?;

        let user = self
            .users
            .create(name, &email, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, login: &Login) -> Result<Session, AuthError> {
        let email = Email::parse(&login.email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&login.password, &password_hash)?;

        let token = self.tokens.issue(user.id, user.role)?;
        Ok(Session {
            token,
            role: user.role,
            name: user.name,
        })
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if NAME_RE.is_match(name) {
        Ok(name)
    } else {
        Err(AuthError::InvalidName)
    }
}

fn validate_email(email: &str) -> Result<Email, AuthError> {
    let email = email.trim();
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(AuthError::InvalidEmail);
    }
    Email::parse(email).map_err(|_| AuthError::InvalidEmail)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(AuthError::WeakPassword)
    }
}

/// Self-registration always yields a customer; `visitante` and `cliente`
/// are accepted aliases.
fn registration_role(requested: Option<&str>) -> Result<Role, AuthError> {
    match requested.map(str::trim) {
        None | Some("" | "cliente" | "visitante" | "customer") => Ok(Role::Customer),
        Some("admin") => Err(AuthError::AdminSelfRegistration),
        Some(_) => Err(AuthError::InvalidRole),
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        assert_eq!(validate_name("  José Núñez ").unwrap(), "José Núñez");
        assert!(validate_name("A").is_err());
        assert!(validate_name("R2D2").is_err());
        assert!(validate_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        let long = format!("{}@example.com", "a".repeat(95));
        assert!(matches!(validate_email(&long), Err(AuthError::InvalidEmail)));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"x".repeat(32)).is_ok());
        assert!(validate_password(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_registration_role() {
        assert_eq!(registration_role(None).unwrap(), Role::Customer);
        assert_eq!(registration_role(Some("visitante")).unwrap(), Role::Customer);
        assert_eq!(registration_role(Some("cliente")).unwrap(), Role::Customer);
        assert!(matches!(
            registration_role(Some("admin")),
            Err(AuthError::AdminSelfRegistration)
        ));
        assert!(matches!(
            registration_role(Some("root")),
            Err(AuthError::InvalidRole)
        ));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
