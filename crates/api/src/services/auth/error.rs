//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Name length or characters rejected.
    #[error("name must be 2 to 50 letters or spaces")]
    InvalidName,

    /// Invalid email format or length.
    #[error("invalid email")]
    InvalidEmail,

    /// Password length outside the accepted range.
    #[error("password must be between 8 and 32 characters")]
    WeakPassword,

    /// Unknown role requested at registration.
    #[error("invalid role")]
    InvalidRole,

    /// Admin accounts are only created through the CLI.
    #[error("cannot self-register as admin")]
    AdminSelfRegistration,

    /// Email already belongs to an account.
    #[error("email already registered")]
    EmailTaken,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] super::TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
