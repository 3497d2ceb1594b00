//! Review repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use catalog_core::{ProductId, ReviewId, Stars, UserId};

use super::{RepositoryError, map_foreign_key_violation};
use crate::models::{NewReview, Review};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    author_name: String,
    comment: String,
    stars: Stars,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_id: UserId::new(row.user_id),
            author_name: row.author_name,
            comment: row.comment,
            stars: row.stars,
            created_at: row.created_at,
        }
    }
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a review written by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        review: &NewReview,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            WITH inserted AS (
                INSERT INTO catalog.review (product_id, user_id, comment, stars)
                VALUES ($1, $2, $3, $4)
                RETURNING id, product_id, user_id, comment, stars, created_at
            )
            SELECT i.id, i.product_id, i.user_id, u.name AS author_name,
                   i.comment, i.stars, i.created_at
            FROM inserted i
            JOIN catalog.user u ON u.id = i.user_id
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(review.comment.trim())
        .bind(review.stars)
        .fetch_optional(self.pool)
        .await
        .map_err(map_foreign_key_violation)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.product_id, r.user_id, u.name AS author_name,
                   r.comment, r.stars, r.created_at
            FROM catalog.review r
            JOIN catalog.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Mean star rating of a product, `None` when it has no reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn average_stars(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let average: Option<Decimal> =
            sqlx::query_scalar(r"SELECT AVG(stars) FROM catalog.review WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(self.pool)
                .await?;
        Ok(average)
    }
}
