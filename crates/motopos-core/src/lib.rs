//! # motopos-core: Pure Business Logic for Moto POS
//!
//! This crate is the **heart** of the pricing and inventory valuation engine.
//! It contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moto POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web front-end (POS, back office)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    routes, auth, Product Catalog service, per-product locks     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ motopos-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────┐ │   │
//! │  │   │  types   │ │ identity │ │ pricing  │ │  report  │ │money │ │   │
//! │  │   │ Product  │ │ SKU, EAN │ │ effective│ │ margins, │ │cents │ │   │
//! │  │   │ Branch.. │ │ -13      │ │ price    │ │ valuation│ │ bps  │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘ └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    motopos-db (Database Layer)                  │   │
//! │  │         SQLite queries, migrations, repositories, stock         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Branch, Role, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`identity`] - SKU and barcode generation
//! - [`pricing`] - Effective price resolution, promotion and tier appends
//! - [`report`] - Margin & valuation reporting
//! - [`stock`] - Stock movement arithmetic (adjust, transfer)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: clock and randomness are parameters
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64), percentages in bps
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use motopos_core::money::Money;
//! use motopos_core::report::level_margin;
//!
//! let retail = Money::from_cents(10000);
//! let cost = Money::from_cents(6000);
//!
//! assert_eq!(retail.apply_percentage_discount(1500).cents(), 8500);
//! assert_eq!(level_margin(retail, cost).margin_bps, Some(4000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod identity;
pub mod money;
pub mod pricing;
pub mod report;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use motopos_core::Money` instead of
// `use motopos_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::IdentityGenerator;
pub use money::Money;
pub use pricing::{effective_price, quote, PriceQuote};
pub use report::{build_margin_report, MarginReport};
pub use stock::{AdjustDirection, MovementKind, NewStockMovement, StockMovement};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity a single price quote accepts.
///
/// ## Business Reason
/// Wholesale orders of consumables (bulbs, fuses) run into the thousands,
/// but a six-figure quantity is always a typo.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Largest unit count one branch may hold of one product.
///
/// ## Business Reason
/// A billion of anything is far past any warehouse. The stock ledger still
/// checks `purchase_price × units` before accepting a write.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

/// Largest monetary amount accepted on input, in cents (one trillion in
/// major units, enough headroom for rupiah prices).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000_000;

/// Roles seeded at system init, with their default permissions.
///
/// ## Business Reason
/// Every store needs these three from day one. They can be edited but not
/// deleted or renamed, so a store can never lock itself out of admin.
pub const SYSTEM_ROLES: &[(&str, &str, &[&str])] = &[
    (
        "Admin",
        "Full access to every branch and setting",
        &[
            "products.manage",
            "pricing.manage",
            "stock.manage",
            "reports.view",
            "branches.manage",
            "roles.manage",
            "company.manage",
        ],
    ),
    (
        "Branch Manager",
        "Manages products and stock for one branch",
        &[
            "products.manage",
            "pricing.manage",
            "stock.manage",
            "reports.view",
        ],
    ),
    (
        "Cashier",
        "Runs the till and looks up prices",
        &["products.view", "pricing.view"],
    ),
];
