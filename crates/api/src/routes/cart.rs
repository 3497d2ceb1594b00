//! Cart and checkout route handlers.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use catalog_core::ProductId;

use super::{IdPath, message};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::QuantityChange;
use crate::state::AppState;

/// Body of the add and update endpoints. A missing body means one unit.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityBody {
    pub quantity: Option<i32>,
}

impl QuantityBody {
    fn quantity(body: Option<Json<Self>>) -> i32 {
        body.and_then(|Json(b)| b.quantity).unwrap_or(1)
    }
}

/// `GET /carrito` - the caller's cart lines.
#[instrument(skip_all, fields(user_id = %claims.user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<impl IntoResponse> {
    let lines = state.cart().list(claims.user_id).await?;
    Ok(Json(lines))
}

/// `POST /carrito/{product_id}` - add units to the cart.
#[instrument(skip_all, fields(user_id = %claims.user_id, product_id = %product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    IdPath(product_id): IdPath<ProductId>,
    body: Option<Json<QuantityBody>>,
) -> Result<impl IntoResponse> {
    let quantity = QuantityBody::quantity(body);
    state
        .cart()
        .add_item(claims.user_id, product_id, quantity)
        .await?;
    Ok(message("product added to cart"))
}

/// `PUT /carrito/{product_id}` - set a line's quantity; zero or less removes it.
#[instrument(skip_all, fields(user_id = %claims.user_id, product_id = %product_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    IdPath(product_id): IdPath<ProductId>,
    body: Option<Json<QuantityBody>>,
) -> Result<impl IntoResponse> {
    let quantity = QuantityBody::quantity(body);
    let change = state
        .cart()
        .set_quantity(claims.user_id, product_id, quantity)
        .await?;

    Ok(match change {
        QuantityChange::Updated => message("quantity updated"),
        QuantityChange::Removed => message("product removed from cart"),
    })
}

/// `DELETE /carrito/{product_id}` - remove a line.
#[instrument(skip_all, fields(user_id = %claims.user_id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    IdPath(product_id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    state.cart().remove_item(claims.user_id, product_id).await?;
    Ok(message("product removed from cart"))
}

/// `POST /carrito/finalizar` - reserve stock for the whole cart.
#[instrument(skip_all, fields(user_id = %claims.user_id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<impl IntoResponse> {
    let receipt = state.checkout().checkout(claims.user_id).await?;
    Ok(Json(json!({
        "message": "purchase completed",
        "receipt": receipt,
    })))
}
