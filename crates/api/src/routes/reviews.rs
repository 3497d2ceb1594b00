//! Review route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;
use tracing::instrument;

use catalog_core::ProductId;

use super::IdPath;
use crate::db::{RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::NewReview;
use crate::state::AppState;

/// Longest accepted review comment, in characters.
const MAX_COMMENT_LENGTH: usize = 1000;

/// `GET /resenas/{product_id}` - reviews newest first.
#[instrument(skip_all, fields(product_id = %product_id))]
pub async fn index(
    State(state): State<AppState>,
    IdPath(product_id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;
    Ok(Json(reviews))
}

/// `POST /resenas/{product_id}` - write a review.
#[instrument(skip_all, fields(user_id = %claims.user_id, product_id = %product_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    IdPath(product_id): IdPath<ProductId>,
    Json(review): Json<NewReview>,
) -> Result<impl IntoResponse> {
    let comment_len = review.comment.trim().chars().count();
    if comment_len == 0 {
        return Err(AppError::BadRequest("comment is required".to_owned()));
    }
    if comment_len > MAX_COMMENT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }

    let review = ReviewRepository::new(state.pool())
        .create(product_id, claims.user_id, &review)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("product not found".to_owned()),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /resenas/{product_id}/promedio` - mean star rating.
#[instrument(skip_all, fields(product_id = %product_id))]
pub async fn average(
    State(state): State<AppState>,
    IdPath(product_id): IdPath<ProductId>,
) -> Result<impl IntoResponse> {
    let average = ReviewRepository::new(state.pool())
        .average_stars(product_id)
        .await?;
    Ok(Json(json!({ "average": format_average(average) })))
}

/// One decimal place, `"0.0"` when there are no reviews.
fn format_average(average: Option<Decimal>) -> String {
    let value = average
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_average() {
        assert_eq!(format_average(None), "0.0");
        assert_eq!(format_average(Some(Decimal::new(4, 0))), "4.0");
        assert_eq!(format_average(Some(Decimal::new(366_667, 5))), "3.7");
        assert_eq!(format_average(Some(Decimal::new(425, 2))), "4.3");
    }
}
