//! Domain models for the catalog API.
//!
//! These types represent validated domain objects separate from database row types.

pub mod cart;
pub mod product;
pub mod review;
pub mod user;

pub use cart::{CartLine, CheckoutReceipt, ReceiptLine};
pub use product::{NewProduct, Product, ProductFilter, ProductUpdate};
pub use review::{NewReview, Review};
pub use user::User;
