//! Service layer: the logic behind the HTTP routes.
//!
//! - [`catalog`] - Product lifecycle, pricing, stock and reporting
//! - [`admin`] - Bootstrap, login, branches, lookups, roles, company
//! - [`locks`] - Per-product mutual exclusion

pub mod admin;
pub mod catalog;
pub mod locks;

pub use catalog::{ProductCatalog, StockReading};
pub use locks::LockRegistry;
