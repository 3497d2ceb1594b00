//! Registration and login route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use super::message;
use crate::error::Result;
use crate::services::{AuthService, Login, Registration};
use crate::state::AppState;

/// `POST /auth/registro`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<impl IntoResponse> {
    AuthService::new(state.pool(), state.tokens())
        .register(&registration)
        .await?;
    Ok((StatusCode::CREATED, message("user registered")))
}

/// `POST /auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(login): Json<Login>,
) -> Result<impl IntoResponse> {
    let session = AuthService::new(state.pool(), state.tokens())
        .login(&login)
        .await?;
    Ok(Json(session))
}
