//! Cart line mutations.

use thiserror::Error;
use tracing::instrument;

use catalog_core::{ProductId, UserId};

use crate::db::{CartStore, RepositoryError};
use crate::models::CartLine;

/// Errors from cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The user's cart has no line for this product.
    #[error("product not in cart")]
    NotInCart,

    /// Added quantities must be at least 1.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i32),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What [`CartService::set_quantity`] did to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated,
    Removed,
}

/// Cart operations for a single user at a time.
pub struct CartService<S> {
    store: S,
}

impl<S: CartStore> CartService<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Cart lines in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, CartError> {
        Ok(self.store.cart_lines(user_id).await?)
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// The product is not checked here; checkout reports missing products.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity < 1`.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        self.store.add_item(user_id, product_id, quantity).await?;
        Ok(())
    }

    /// Overwrite a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the user has no line for the product.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<QuantityChange, CartError> {
        let (found, change) = if quantity > 0 {
            let found = self
                .store
                .update_quantity(user_id, product_id, quantity)
                .await?;
            (found, QuantityChange::Updated)
        } else {
            let found = self.store.remove_item(user_id, product_id).await?;
            (found, QuantityChange::Removed)
        };

        if found { Ok(change) } else { Err(CartError::NotInCart) }
    }

    /// Remove a line. Removing an absent line succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), CartError> {
        self.store.remove_item(user_id, product_id).await?;
        Ok(())
    }
}
