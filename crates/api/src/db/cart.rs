//! Cart repository for `PostgreSQL`.
//!
//! Cart lines are rows keyed by `(user_id, product_id)`. Every mutation is a
//! single targeted statement, so two requests for the same user never
//! overwrite each other's lines. `product_id` is intentionally not a foreign
//! key: a line may outlive its product, and checkout reports that case.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use catalog_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::ProductRow;
use super::store::{CartStore, CommitOutcome, Reservation, Shortfall, lock_order};
use crate::models::CartLine;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Cart line joined with its (possibly deleted) product.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    quantity: i32,
    product_row_id: Option<i32>,
    name: Option<String>,
    price: Option<Decimal>,
    description: Option<String>,
    stock: Option<i32>,
    image: Option<String>,
    category: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let product = match row.product_row_id {
            None => None,
            Some(id) => {
                let missing =
                    || RepositoryError::DataCorruption(format!("incomplete product row {id}"));
                let product_row = ProductRow {
                    id,
                    name: row.name.ok_or_else(missing)?,
                    price: row.price.ok_or_else(missing)?,
                    description: row.description.ok_or_else(missing)?,
                    stock: row.stock.ok_or_else(missing)?,
                    image: row.image,
                    category: row.category.ok_or_else(missing)?,
                    created_at: row.created_at.ok_or_else(missing)?,
                    updated_at: row.updated_at.ok_or_else(missing)?,
                };
                Some(product_row.try_into()?)
            }
        };

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            product,
        })
    }
}

/// Counts reported by [`CartRepository::prune_orphans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    /// Lines referencing a product that no longer exists.
    pub orphaned_lines: i64,
    /// Distinct users owning at least one orphaned line.
    pub affected_users: i64,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count, and unless `dry_run` delete, cart lines whose product is gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn prune_orphans(&self, dry_run: bool) -> Result<PruneReport, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (orphaned_lines, affected_users): (i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*), COUNT(DISTINCT c.user_id)
            FROM catalog.cart_item c
            WHERE NOT EXISTS (SELECT 1 FROM catalog.product p WHERE p.id = c.product_id)
            ",
        )
        .fetch_one(&mut *tx)
        .await?;

        if !dry_run && orphaned_lines > 0 {
            sqlx::query(
                r"
                DELETE FROM catalog.cart_item c
                WHERE NOT EXISTS (SELECT 1 FROM catalog.product p WHERE p.id = c.product_id)
                ",
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(PruneReport {
            orphaned_lines,
            affected_users,
        })
    }
}

impl CartStore for CartRepository<'_> {
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.product_id, c.quantity,
                   p.id AS product_row_id, p.name, p.price, p.description,
                   p.stock, p.image, p.category, p.created_at, p.updated_at
            FROM catalog.cart_item c
            LEFT JOIN catalog.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.added_at, c.product_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = catalog.cart_item.quantity + EXCLUDED.quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE catalog.cart_item
            SET quantity = $3
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM catalog.cart_item
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit_checkout(
        &self,
        user_id: UserId,
        reservations: &[Reservation],
    ) -> Result<CommitOutcome, RepositoryError> {
        let ordered = lock_order(reservations);
        let product_ids: Vec<i32> = ordered.iter().map(|r| r.product_id.as_i32()).collect();
        let quantities: Vec<i32> = ordered.iter().map(|r| r.quantity).collect();
        let mut tx = self.pool.begin().await?;

        // Lock the reserved lines first. A second checkout of the same cart
        // waits here and then sees the lines the first one cleared.
        let locked: Vec<(i32, i32)> = sqlx::query_as(
            r"
            SELECT product_id, quantity
            FROM catalog.cart_item
            WHERE user_id = $1 AND product_id = ANY($2)
            ORDER BY product_id
            FOR UPDATE
            ",
        )
        .bind(user_id)
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;

        for reservation in &ordered {
            let in_cart = locked
                .iter()
                .find(|(id, _)| *id == reservation.product_id.as_i32())
                .map_or(0, |&(_, quantity)| quantity);
            if in_cart < reservation.quantity {
                tx.rollback().await?;
                return Ok(CommitOutcome::Rejected(Shortfall::CartChanged(
                    reservation.product_id,
                )));
            }
        }

        for reservation in &ordered {
            let reserved: Option<i32> = sqlx::query_scalar(
                r"
                UPDATE catalog.product
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                RETURNING id
                ",
            )
            .bind(reservation.product_id)
            .bind(reservation.quantity)
            .fetch_optional(&mut *tx)
            .await?;

            if reserved.is_some() {
                continue;
            }

            let name: Option<String> =
                sqlx::query_scalar(r"SELECT name FROM catalog.product WHERE id = $1")
                    .bind(reservation.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            tx.rollback().await?;

            let shortfall = match name {
                Some(name) => Shortfall::Insufficient {
                    product_id: reservation.product_id,
                    name,
                },
                None => Shortfall::Gone(reservation.product_id),
            };
            return Ok(CommitOutcome::Rejected(shortfall));
        }

        // Lines whose quantity grew after the snapshot keep the difference.
        sqlx::query(
            r"
            DELETE FROM catalog.cart_item c
            USING UNNEST($2::int4[], $3::int4[]) AS r(product_id, quantity)
            WHERE c.user_id = $1
              AND c.product_id = r.product_id
              AND c.quantity <= r.quantity
            ",
        )
        .bind(user_id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE catalog.cart_item c
            SET quantity = c.quantity - r.quantity
            FROM UNNEST($2::int4[], $3::int4[]) AS r(product_id, quantity)
            WHERE c.user_id = $1
              AND c.product_id = r.product_id
              AND c.quantity > r.quantity
            ",
        )
        .bind(user_id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Committed)
    }
}
