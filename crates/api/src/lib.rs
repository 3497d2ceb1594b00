//! Catalog API library.
//!
//! Product catalog, carts, favorites and reviews over `PostgreSQL`, with an
//! all-or-nothing checkout that reserves stock for a whole cart. The binary
//! in `main.rs` wires this into a server; the CLI and integration tests use
//! the same modules.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
