//! # motopos-db: Database Layer for Moto POS
//!
//! SQLite persistence for the pricing and inventory engine, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moto POS Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /products/{id}/stock)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Catalog service (per-product lock)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   motopos-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ StockRepo     │    │ 001_initial  │  │   │
//! │  │   │ Write lock    │    │ BranchRepo    │    │   _schema    │  │   │
//! │  │   │ Timeouts      │    │ Lookups, ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, read/write transactions, query timeouts
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use motopos_db::{Database, DbConfig, StockRepository};
//!
//! let db = Database::new(DbConfig::new("motopos.db")).await?;
//!
//! let live = db.bounded(db.products().count()).await?;
//!
//! let mut tx = db.begin_write().await?;
//! let before = StockRepository::quantity(tx.conn(), &id, &branch_id).await?;
//! StockRepository::set(tx.conn(), &id, &branch_id, 50, Utc::now()).await?;
//! StockRepository::record(tx.conn(), &movement, Utc::now()).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, WriteTransaction};

// Repository re-exports for convenience
pub use repository::branch::BranchRepository;
pub use repository::company::CompanyRepository;
pub use repository::generate_id;
pub use repository::lookup::{BrandRepository, CategoryRepository, LookupEntity, LookupRepository};
pub use repository::product::{IdentityField, ProductRepository};
pub use repository::role::RoleRepository;
pub use repository::stock::StockRepository;
pub use repository::user::UserRepository;
