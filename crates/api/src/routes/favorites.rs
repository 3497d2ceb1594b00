//! Favorites route handlers.

use axum::{Json, extract::State, response::IntoResponse};
use tracing::instrument;

use catalog_core::ProductId;

use super::{IdPath, message};
use crate::db::{FavoriteRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `GET /favoritos`
#[instrument(skip_all, fields(user_id = %claims.user_id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<impl IntoResponse> {
    let products = FavoriteRepository::new(state.pool())
        .list(claims.user_id)
        .await?;
    Ok(Json(products))
}

/// `POST /favoritos/{product_id}`
#[instrument(skip_all, fields(user_id = %claims.user_id, product_id = %product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    IdPath(product_id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    FavoriteRepository::new(state.pool())
        .add(claims.user_id, product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("product not found".to_owned()),
            other => other.into(),
        })?;
    Ok(message("favorite added"))
}

/// `DELETE /favoritos/{product_id}`
#[instrument(skip_all, fields(user_id = %claims.user_id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    IdPath(product_id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    FavoriteRepository::new(state.pool())
        .remove(claims.user_id, product_id)
        .await?;
    Ok(message("favorite removed"))
}
