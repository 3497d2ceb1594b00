//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{Price, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    /// Units available for checkout. Never negative.
    pub stock: i32,
    /// Public path of the product image (e.g. `/uploads/<file>`).
    pub image: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub description: String,
    pub stock: i32,
    pub image: Option<String>,
    pub category: String,
}

/// Partial update for a product. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub stock: Option<i32>,
    pub image: Option<String>,
    pub category: Option<String>,
}

impl ProductUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.stock.is_none()
            && self.image.is_none()
            && self.category.is_none()
    }
}

/// Listing filter for `GET /productos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub q: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}
