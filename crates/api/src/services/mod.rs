//! Business logic services for the catalog API.
//!
//! # Services
//!
//! - `checkout` - Stock reservation for a user's whole cart (all or nothing)
//! - `cart` - Cart line mutations
//! - `auth` - Registration, login, and bearer access tokens
//! - `uploads` - Product image validation and storage

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod uploads;

pub use auth::{
    AuthError, AuthService, Claims, Login, Registration, Session, TokenError, TokenService,
};
pub use cart::{CartError, CartService, QuantityChange};
pub use checkout::{CheckoutError, CheckoutService};
pub use uploads::{ImageUpload, UploadError};
