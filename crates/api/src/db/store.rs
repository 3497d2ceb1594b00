//! Cart storage contract used by the cart and checkout services.
//!
//! Two implementations exist: [`CartRepository`](super::CartRepository) over
//! `PostgreSQL`, and [`MemoryStore`](super::MemoryStore) for tests and local
//! experiments. Both must honor the same commit semantics: a checkout commit
//! applies every reservation or none of them.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use catalog_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::CartLine;

/// Units of one product to take out of stock during a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Why a commit could not reserve a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    /// The product row no longer exists.
    Gone(ProductId),
    /// The product exists but has fewer units than requested.
    Insufficient { product_id: ProductId, name: String },
    /// The cart line was removed or lowered after the cart was read, for
    /// example by a second checkout of the same cart.
    CartChanged(ProductId),
}

/// Result of [`CartStore::commit_checkout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All stock was decremented and the reserved cart lines were cleared.
    Committed,
    /// Nothing was written.
    Rejected(Shortfall),
}

/// Storage operations behind a user's cart.
pub trait CartStore: Send + Sync {
    /// Cart lines in the order they were added, products resolved.
    fn cart_lines(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;

    /// Add `quantity` units, merging into an existing line.
    fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite a line's quantity. Returns `false` if the line does not exist.
    fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete a line. Returns `false` if the line did not exist.
    fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Atomically decrement stock for every reservation and clear the
    /// reserved quantities from the cart.
    ///
    /// Every reservation must still be backed by a cart line holding at least
    /// its quantity, and each decrement is a check-and-set against the stock
    /// at write time, so a reservation validated earlier can still be
    /// rejected here. On rejection no stock and no cart line is modified.
    fn commit_checkout(
        &self,
        user_id: UserId,
        reservations: &[Reservation],
    ) -> impl Future<Output = Result<CommitOutcome, RepositoryError>> + Send;
}

impl<S: CartStore> CartStore for Arc<S> {
    fn cart_lines(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send {
        (**self).cart_lines(user_id)
    }

    fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).add_item(user_id, product_id, quantity)
    }

    fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        (**self).update_quantity(user_id, product_id, quantity)
    }

    fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        (**self).remove_item(user_id, product_id)
    }

    fn commit_checkout(
        &self,
        user_id: UserId,
        reservations: &[Reservation],
    ) -> impl Future<Output = Result<CommitOutcome, RepositoryError>> + Send {
        (**self).commit_checkout(user_id, reservations)
    }
}

/// Sort reservations by product id so concurrent commits touching the same
/// products acquire row locks in the same order. Repeated products are merged
/// into one reservation.
#[must_use]
pub fn lock_order(reservations: &[Reservation]) -> Vec<Reservation> {
    let mut merged: BTreeMap<ProductId, i32> = BTreeMap::new();
    for reservation in reservations {
        let quantity = merged.entry(reservation.product_id).or_default();
        *quantity = quantity.saturating_add(reservation.quantity);
    }
    merged
        .into_iter()
        .map(|(product_id, quantity)| Reservation {
            product_id,
            quantity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_sorts_by_product_id() {
        let reservations = [
            Reservation {
                product_id: ProductId::new(9),
                quantity: 1,
            },
            Reservation {
                product_id: ProductId::new(2),
                quantity: 4,
            },
            Reservation {
                product_id: ProductId::new(5),
                quantity: 2,
            },
        ];

        let ids: Vec<i32> = lock_order(&reservations)
            .iter()
            .map(|r| r.product_id.as_i32())
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_lock_order_merges_repeated_products() {
        let reservations = [
            Reservation {
                product_id: ProductId::new(3),
                quantity: 3,
            },
            Reservation {
                product_id: ProductId::new(1),
                quantity: 1,
            },
            Reservation {
                product_id: ProductId::new(3),
                quantity: 3,
            },
        ];

        let merged = lock_order(&reservations);
        assert_eq!(
            merged,
            vec![
                Reservation {
                    product_id: ProductId::new(1),
                    quantity: 1,
                },
                Reservation {
                    product_id: ProductId::new(3),
                    quantity: 6,
                },
            ]
        );
    }
}
