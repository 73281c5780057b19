//! Bundlecart
//!
//! An in-memory marketplace core: a product catalog with per-seller
//! inventory, seller-scoped discount bundles, and a single shopping cart
//! that reserves stock as items are added and recomputes its total from
//! scratch on every change.

pub mod bundles;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod fixtures;
pub mod observability;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod reservation;
pub mod shell;
pub mod store;
