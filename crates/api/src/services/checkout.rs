//! Checkout: turn a user's cart into committed stock reservations.
//!
//! A checkout runs in two passes. The validation pass walks the cart in order
//! and stops at the first line whose product is gone or short on stock,
//! without writing anything. The commit pass hands every line to
//! [`CartStore::commit_checkout`], which re-checks the cart lines and the
//! stock at write time and applies all lines or none. The validation
//! result is only used to fail fast; it is never trusted for the write.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use catalog_core::{ProductId, UserId};

use crate::db::{CartStore, CommitOutcome, RepositoryError, Reservation, Shortfall};
use crate::models::{CartLine, CheckoutReceipt, ReceiptLine};

/// Errors returned by [`CheckoutService::checkout`].
///
/// Everything except `Repository` is a business rejection.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart empty")]
    EmptyCart,

    /// A line references a product that no longer exists.
    #[error("product gone")]
    ProductGone { product_id: ProductId },

    /// A product has fewer units than the line asks for.
    #[error("insufficient stock: {name}")]
    InsufficientStock { product_id: ProductId, name: String },

    /// The cart changed while the checkout was running, e.g. the same cart
    /// was checked out twice at once. Nothing was reserved.
    #[error("cart changed during checkout, please retry")]
    CartChanged { product_id: ProductId },

    /// Storage failure. No stock change survives it.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    /// Whether this error is a business rejection rather than a fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}

impl From<Shortfall> for CheckoutError {
    fn from(shortfall: Shortfall) -> Self {
        match shortfall {
            Shortfall::Gone(product_id) => Self::ProductGone { product_id },
            Shortfall::Insufficient { product_id, name } => {
                Self::InsufficientStock { product_id, name }
            }
            Shortfall::CartChanged(product_id) => Self::CartChanged { product_id },
        }
    }
}

/// Checkout engine over any [`CartStore`].
pub struct CheckoutService<S> {
    store: S,
}

impl<S: CartStore> CheckoutService<S> {
    /// Create a checkout service over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserve stock for every line in the user's cart and clear the cart.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` if the cart has no lines (nothing is written).
    /// - `CheckoutError::ProductGone` / `CheckoutError::InsufficientStock` for the
    ///   first failing line, found either by validation or at commit time.
    ///   Nothing is written.
    /// - `CheckoutError::Repository` on storage failure.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: UserId) -> Result<CheckoutReceipt, CheckoutError> {
        let lines = self.store.cart_lines(user_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let receipt = validate(&lines)?;
        let reservations: Vec<Reservation> = receipt
            .lines
            .iter()
            .map(|line| Reservation {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();

        match self.store.commit_checkout(user_id, &reservations).await? {
            CommitOutcome::Committed => {
                tracing::info!(
                    lines = receipt.lines.len(),
                    total_units = receipt.total_units,
                    "Checkout committed"
                );
                Ok(receipt)
            }
            CommitOutcome::Rejected(shortfall) => {
                tracing::info!(?shortfall, "Checkout rejected at commit");
                Err(shortfall.into())
            }
        }
    }
}

/// Validation pass: check every line against the snapshot without writing.
///
/// Returns the receipt the checkout would produce, or the first violation in
/// cart order.
///
/// # Errors
///
/// Returns `CheckoutError::ProductGone` or `CheckoutError::InsufficientStock`.
pub fn validate(lines: &[CartLine]) -> Result<CheckoutReceipt, CheckoutError> {
    let mut receipt_lines = Vec::with_capacity(lines.len());
    let mut total_units: i64 = 0;
    let mut total = Decimal::ZERO;

    for line in lines {
        let product = line.product.as_ref().ok_or(CheckoutError::ProductGone {
            product_id: line.product_id,
        })?;

        if product.stock < line.quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
            });
        }

        let subtotal = product.price.times(line.quantity);
        total = total.saturating_add(subtotal);
        total_units += i64::from(line.quantity);
        receipt_lines.push(ReceiptLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
            subtotal,
        });
    }

    Ok(CheckoutReceipt {
        lines: receipt_lines,
        total_units,
        total,
    })
}
