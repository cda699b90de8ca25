//! # Repository Module
//!
//! Database repository implementations for Moto POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two ways into a repository                           │
//! │                                                                         │
//! │  1. Standalone call (owns its own connection / read snapshot)          │
//! │       db.products().count()                                             │
//! │       db.branches().list()                                              │
//! │                                                                         │
//! │  2. Part of a caller's transaction (associated fns on a connection)    │
//! │       let mut tx = db.begin_write().await?;                            │
//! │       let product = ProductRepository::load_live(tx.conn(), id).await?;│
//! │       StockRepository::set(tx.conn(), id, branch, 50, now).await?;     │
//! │       ProductRepository::touch(tx.conn(), id, now).await?;             │
//! │       tx.commit().await?;                                              │
//! │                                                                         │
//! │  Multi-statement mutations always take form 2, so they commit or roll  │
//! │  back as one unit.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Products with promotions, tiers and stock
//! - [`stock::StockRepository`] - Per-branch stock ledger and movement history
//! - [`branch::BranchRepository`] - Branches
//! - [`lookup::CategoryRepository`], [`lookup::BrandRepository`] - Lookups
//! - [`role::RoleRepository`], [`user::UserRepository`] - Access control
//! - [`company::CompanyRepository`] - Store profile

pub mod branch;
pub mod company;
pub mod lookup;
pub mod product;
pub mod role;
pub mod stock;
pub mod user;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DbError, DbResult};

/// Encodes a value for a JSON TEXT column.
pub(crate) fn to_json<T: Serialize + ?Sized>(column: &str, value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::corrupt(column, e))
}

/// Decodes a JSON TEXT column.
pub(crate) fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> DbResult<T> {
    serde_json::from_str(raw).map_err(|e| DbError::corrupt(column, e))
}

/// Generates a new entity ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
