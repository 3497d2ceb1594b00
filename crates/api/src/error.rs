//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Business rejections become
//! 4xx responses and are logged at `info`; internal faults become a 500 with a
//! fixed message and are captured to Sentry. All bodies are
//! `{"message": "..."}`.

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CheckoutError, UploadError};

/// Message sent for every internal fault.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the catalog API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Cart(#[from] CartError),

    /// Authentication operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Malformed multipart body.
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// Path parameter that doesn't parse, e.g. a non-numeric id.
    #[error(transparent)]
    Path(#[from] PathRejection),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(err) => match err {
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::CartChanged { .. } => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Cart(err) => match err {
                CartError::NotInCart => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidName
                | AuthError::InvalidEmail
                | AuthError::WeakPassword
                | AuthError::InvalidRole
                | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
                AuthError::AdminSelfRegistration => StatusCode::FORBIDDEN,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::PasswordHash | AuthError::Token(_) | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Upload(err) if err.is_rejection() => StatusCode::BAD_REQUEST,
            Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Multipart(err) => err.status(),
            Self::Path(err) => err.status(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return INTERNAL_MESSAGE.to_owned();
        }
        match self {
            Self::Multipart(err) => err.body_text(),
            Self::Path(err) => err.body_text(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::info!(status = status.as_u16(), reason = %self, "Request rejected");
        }

        let message = self.public_message(status);
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractors so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
