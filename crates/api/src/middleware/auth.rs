//! Bearer token extractors.
//!
//! Handlers that need an identity take [`RequireAuth`] or [`RequireAdmin`] as
//! an argument. The token comes from `Authorization: Bearer <token>` and is
//! checked by the [`TokenService`](crate::services::TokenService) in state.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::set_sentry_user;
use crate::services::Claims;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}!", claims.user_id)
/// }
/// ```
pub struct RequireAuth(pub Claims);

/// Extractor that requires a valid bearer token with the admin role.
pub struct RequireAdmin(pub Claims);

/// Why a request was refused by an auth extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Bad signature, malformed, or expired.
    InvalidToken,
    /// Valid token without the admin role.
    NotAdmin,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "token required"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid token"),
            Self::NotAdmin => (StatusCode::FORBIDDEN, "admin access required"),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Token from an `Authorization` header value, if it uses the bearer scheme.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthRejection::MissingToken)?;

        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthRejection::InvalidToken
        })?;

        set_sentry_user(&claims.user_id);
        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;
        if claims.role.is_admin() {
            Ok(Self(claims))
        } else {
            Err(AuthRejection::NotAdmin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc.def "), Some("abc.def"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc.def"), None);
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::NotAdmin.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
