//! Cart and checkout domain types.

use rust_decimal::Decimal;
use serde::Serialize;

use catalog_core::{Price, ProductId};

use super::Product;

/// A cart line with its product resolved.
///
/// `product` is `None` when the referenced product has been deleted since the
/// line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub product: Option<Product>,
}

/// One reserved line of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Price,
    pub subtotal: Decimal,
}

/// Confirmation returned by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub lines: Vec<ReceiptLine>,
    pub total_units: i64,
    pub total: Decimal,
}
