//! In-process [`CartStore`] used by tests and local experiments.
//!
//! All state sits behind one async mutex. A commit holds the lock for its
//! whole check-and-apply step, which gives the same all-or-nothing and
//! no-oversell guarantees as the `PostgreSQL` transaction.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::Mutex;

use catalog_core::{Price, ProductId, UserId};

use super::RepositoryError;
use super::store::{CartStore, CommitOutcome, Reservation, Shortfall, lock_order};
use crate::models::{CartLine, Product};

#[derive(Debug, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<UserId, Vec<(ProductId, i32)>>,
    next_product_id: i32,
}

/// In-memory product and cart storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product and return it.
    pub async fn insert_product(&self, name: &str, price: Price, stock: i32) -> Product {
        let mut state = self.state.lock().await;
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_product_id),
            name: name.to_owned(),
            price,
            description: String::new(),
            stock,
            image: None,
            category: String::new(),
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        product
    }

    /// Delete a product. Cart lines referencing it are kept.
    pub async fn delete_product(&self, product_id: ProductId) -> bool {
        self.state
            .lock()
            .await
            .products
            .remove(&product_id)
            .is_some()
    }

    /// Overwrite a product's stock, as an admin edit would.
    pub async fn set_stock(&self, product_id: ProductId, stock: i32) -> bool {
        let mut state = self.state.lock().await;
        match state.products.get_mut(&product_id) {
            Some(product) => {
                product.stock = stock;
                product.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Current stock of a product, `None` if it doesn't exist.
    pub async fn stock(&self, product_id: ProductId) -> Option<i32> {
        self.state
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }
}

impl CartStore for MemoryStore {
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        let lines = state
            .carts
            .get(&user_id)
            .map(|lines| {
                lines
                    .iter()
                    .map(|&(product_id, quantity)| CartLine {
                        product_id,
                        quantity,
                        product: state.products.get(&product_id).cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(lines)
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let lines = state.carts.entry(user_id).or_default();
        match lines.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, existing)) => {
                *existing = existing.checked_add(quantity).ok_or_else(|| {
                    RepositoryError::Conflict("cart quantity overflow".to_owned())
                })?;
            }
            None => lines.push((product_id, quantity)),
        }
        Ok(())
    }

    async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let line = state
            .carts
            .get_mut(&user_id)
            .and_then(|lines| lines.iter_mut().find(|(id, _)| *id == product_id));
        match line {
            Some((_, existing)) => {
                *existing = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(lines) = state.carts.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = lines.len();
        lines.retain(|(id, _)| *id != product_id);
        Ok(lines.len() != before)
    }

    async fn commit_checkout(
        &self,
        user_id: UserId,
        reservations: &[Reservation],
    ) -> Result<CommitOutcome, RepositoryError> {
        let ordered = lock_order(reservations);
        let mut state = self.state.lock().await;

        let cart = state.carts.get(&user_id);
        for reservation in &ordered {
            let in_cart = cart
                .and_then(|lines| lines.iter().find(|(id, _)| *id == reservation.product_id))
                .map_or(0, |&(_, quantity)| quantity);
            if in_cart < reservation.quantity {
                return Ok(CommitOutcome::Rejected(Shortfall::CartChanged(
                    reservation.product_id,
                )));
            }

            match state.products.get(&reservation.product_id) {
                None => {
                    return Ok(CommitOutcome::Rejected(Shortfall::Gone(
                        reservation.product_id,
                    )));
                }
                Some(product) if product.stock < reservation.quantity => {
                    return Ok(CommitOutcome::Rejected(Shortfall::Insufficient {
                        product_id: product.id,
                        name: product.name.clone(),
                    }));
                }
                Some(_) => {}
            }
        }

        let now = Utc::now();
        for reservation in &ordered {
            if let Some(product) = state.products.get_mut(&reservation.product_id) {
                product.stock -= reservation.quantity;
                product.updated_at = now;
            }
        }

        if let Some(lines) = state.carts.get_mut(&user_id) {
            for reservation in &ordered {
                if let Some(line) = lines
                    .iter_mut()
                    .find(|(id, _)| *id == reservation.product_id)
                {
                    line.1 -= reservation.quantity;
                }
            }
            lines.retain(|&(_, quantity)| quantity > 0);
        }

        Ok(CommitOutcome::Committed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_add_item_merges_quantities() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let product = store.insert_product("Mug", price("8.00"), 10).await;

        store.add_item(user, product.id, 2).await.unwrap();
        store.add_item(user, product.id, 3).await.unwrap();

        let lines = store.cart_lines(user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_cart_lines_keep_insertion_order() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let a = store.insert_product("A", price("1"), 1).await;
        let b = store.insert_product("B", price("1"), 1).await;

        store.add_item(user, b.id, 1).await.unwrap();
        store.add_item(user, a.id, 1).await.unwrap();

        let ids: Vec<ProductId> = store
            .cart_lines(user)
            .await
            .unwrap()
            .iter()
            .map(|l| l.product_id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_deleted_product_resolves_to_none() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let product = store.insert_product("Lamp", price("30"), 2).await;
        store.add_item(user, product.id, 1).await.unwrap();

        assert!(store.delete_product(product.id).await);

        let lines = store.cart_lines(user).await.unwrap();
        assert_eq!(lines[0].product, None);
    }

    #[tokio::test]
    async fn test_update_and_remove_report_presence() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let product = store.insert_product("Pen", price("1.50"), 5).await;

        assert!(!store.update_quantity(user, product.id, 3).await.unwrap());
        assert!(!store.remove_item(user, product.id).await.unwrap());

        store.add_item(user, product.id, 1).await.unwrap();
        assert!(store.update_quantity(user, product.id, 3).await.unwrap());
        assert_eq!(store.cart_lines(user).await.unwrap()[0].quantity, 3);
        assert!(store.remove_item(user, product.id).await.unwrap());
        assert!(store.cart_lines(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_rejects_without_writing() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let a = store.insert_product("A", price("1"), 5).await;
        let b = store.insert_product("B", price("1"), 0).await;
        store.add_item(user, a.id, 2).await.unwrap();
        store.add_item(user, b.id, 1).await.unwrap();

        let outcome = store
            .commit_checkout(
                user,
                &[
                    Reservation {
                        product_id: a.id,
                        quantity: 2,
                    },
                    Reservation {
                        product_id: b.id,
                        quantity: 1,
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommitOutcome::Rejected(Shortfall::Insufficient {
                product_id: b.id,
                name: "B".to_owned(),
            })
        );
        assert_eq!(store.stock(a.id).await, Some(5));
        assert_eq!(store.cart_lines(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_keeps_quantity_added_after_snapshot() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let product = store.insert_product("Tea", price("4"), 10).await;
        store.add_item(user, product.id, 2).await.unwrap();
        store.add_item(user, product.id, 1).await.unwrap();

        let outcome = store
            .commit_checkout(
                user,
                &[Reservation {
                    product_id: product.id,
                    quantity: 2,
                }],
            )
            .await
            .unwrap();

        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(store.stock(product.id).await, Some(8));
        assert_eq!(store.cart_lines(user).await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_reservation_missing_from_cart() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let product = store.insert_product("Jar", price("2"), 5).await;
        store.add_item(user, product.id, 1).await.unwrap();

        let outcome = store
            .commit_checkout(
                user,
                &[Reservation {
                    product_id: product.id,
                    quantity: 2,
                }],
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommitOutcome::Rejected(Shortfall::CartChanged(product.id))
        );
        assert_eq!(store.stock(product.id).await, Some(5));
        assert_eq!(store.cart_lines(user).await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_commit_sums_repeated_reservations() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let product = store.insert_product("Cup", price("2"), 5).await;
        store.add_item(user, product.id, 6).await.unwrap();

        let half = Reservation {
            product_id: product.id,
            quantity: 3,
        };
        let outcome = store.commit_checkout(user, &[half, half]).await.unwrap();

        assert!(matches!(
            outcome,
            CommitOutcome::Rejected(Shortfall::Insufficient { .. })
        ));
        assert_eq!(store.stock(product.id).await, Some(5));
    }
}
