//! # Domain Types
//!
//! Core domain types used throughout Moto POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐    owns by value    ┌─────────────────────┐  │
//! │  │       Product        │ ──────────────────► │ PromotionalPricing  │  │
//! │  │  ──────────────────  │  (append-only,      │ VolumeDiscount      │  │
//! │  │  id (UUID)           │   position-keyed)   └─────────────────────┘  │
//! │  │  sku / barcode       │                                              │
//! │  │  purchase_price      │    addressed by     ┌─────────────────────┐  │
//! │  │  price_levels {..}   │ ──────────────────► │ stock {branch: qty} │  │
//! │  │  min_stock           │    product id       └─────────────────────┘  │
//! │  └──────────┬───────────┘                                              │
//! │             │ references                                               │
//! │             ▼                                                           │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────┐  │
//! │  │ Category │  │  Brand   │  │  Branch  │  │   Role   │  │  User   │  │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────┘  └─────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every product has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business IDs: `sku` and `barcode` - human-readable, immutable once assigned

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Named price levels of a product: `retail`, `wholesale`, `member`, or any
/// store-defined level.
pub type PriceLevels = BTreeMap<String, Money>;

/// The price level every sellable product must define.
pub const RETAIL_LEVEL: &str = "retail";

/// Units on hand per branch id. Branches without an entry hold zero.
pub type StockLevels = BTreeMap<String, i64>;

// =============================================================================
// Product Status
// =============================================================================

/// Lifecycle state of a product.
///
/// ```text
///   create(is_active=false)        toggle           delete
///  ─────────────────────────► Draft ──────► Active ⇄ Inactive ──────► Deleted
///   create(is_active=true) ─────────────────┘
/// ```
///
/// Derived from `is_active`, `activated_at` and `deleted_at`; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Created inactive and never activated.
    Draft,
    Active,
    Inactive,
    /// Tombstoned. Identity stays reserved.
    Deleted,
}

// =============================================================================
// Discount Type
// =============================================================================

/// How a volume discount's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is basis points off the base price (1500 = 15%).
    Percentage,
    /// `discount_value` is cents off the base price, floored at zero.
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

// =============================================================================
// Promotional Pricing
// =============================================================================

/// A time-bounded override of some of a product's price levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PromotionalPricing {
    /// Stable per-product insertion index (0-based).
    pub position: i64,
    pub name: String,
    /// Overrides for the levels this promotion covers.
    pub price_levels: PriceLevels,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PromotionalPricing {
    /// Whether the promotion applies at `at` (both window ends inclusive).
    pub fn is_in_effect(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= at && at <= self.end_date
    }
}

/// Input for appending a promotion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPromotion {
    pub name: String,
    pub price_levels: PriceLevels,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

// =============================================================================
// Volume Discount
// =============================================================================

/// A quantity tier: buy at least `min_quantity` and the discount applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VolumeDiscount {
    pub position: i64,
    pub min_quantity: i64,
    pub discount_type: DiscountType,
    /// Basis points for `Percentage`, cents for `Fixed`.
    pub discount_value: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for appending a volume discount tier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVolumeDiscount {
    pub min_quantity: i64,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub is_active: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A motorbike part (or any stocked item) in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit, e.g. `PRD-482913-K7Q`.
    pub sku: String,

    /// EAN-13 (generated) or a supplier barcode.
    pub barcode: String,

    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub brand_id: String,

    /// Bike models this part fits, e.g. "Honda Vario 125".
    pub compatible_models: Vec<String>,

    /// PCS, SET, LITER, ...
    pub unit_of_measure: String,

    /// Cost of one unit. Stock is valued at this price.
    pub purchase_price: Money,

    pub price_levels: PriceLevels,
    pub technical_specs: BTreeMap<String, String>,
    pub storage_location: Option<String>,
    pub tags: BTreeSet<String>,
    pub labels: BTreeSet<String>,

    /// Low-stock threshold across all branches (0 disables the flag).
    pub min_stock: i64,

    pub is_active: bool,

    /// Append-only, ordered by `position`.
    pub promotional_pricing: Vec<PromotionalPricing>,

    /// Append-only, ordered by `position`.
    pub volume_discounts: Vec<VolumeDiscount>,

    /// Branch ID → units on hand. Missing branches hold zero.
    pub stock: StockLevels,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// First time the product became active. `None` while in Draft.
    #[ts(as = "Option<String>")]
    pub activated_at: Option<DateTime<Utc>>,

    /// Tombstone.
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,

    /// Bumped on every mutation; clients can use it for optimistic checks.
    pub version: i64,
}

impl Product {
    /// Current lifecycle state.
    pub fn status(&self) -> ProductStatus {
        if self.deleted_at.is_some() {
            ProductStatus::Deleted
        } else if self.is_active {
            ProductStatus::Active
        } else if self.activated_at.is_none() {
            ProductStatus::Draft
        } else {
            ProductStatus::Inactive
        }
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the price for a level, if defined.
    pub fn price_level(&self, level: &str) -> Option<Money> {
        self.price_levels.get(level).copied()
    }

    /// Units on hand at one branch (zero when never stocked there).
    pub fn stock_at(&self, branch_id: &str) -> i64 {
        self.stock.get(branch_id).copied().unwrap_or(0)
    }

    /// Units on hand across all branches, `None` if the sum leaves i64.
    pub fn checked_total_stock(&self) -> Option<i64> {
        self.stock
            .values()
            .try_fold(0i64, |acc, qty| acc.checked_add(*qty))
    }

    /// Units on hand across all branches.
    ///
    /// Saturates at `i64::MAX`. The stock ledger refuses writes that would
    /// overflow, so a stored product never reaches the cap.
    pub fn total_stock(&self) -> i64 {
        self.checked_total_stock().unwrap_or(i64::MAX)
    }

    /// Stock valued at purchase cost.
    ///
    /// ## Errors
    /// `ValueOverflow` when the units or their value do not fit in an i64.
    pub fn stock_value(&self) -> CoreResult<Money> {
        self.checked_total_stock()
            .and_then(|units| self.purchase_price.checked_multiply_quantity(units))
            .ok_or_else(|| CoreError::value_overflow("stock_value"))
    }

    /// At or below the configured threshold across all branches.
    /// Always false when `min_stock` is 0.
    pub fn is_low_stock(&self) -> bool {
        self.min_stock > 0 && self.total_stock() <= self.min_stock
    }

    /// Stocked branches holding strictly fewer than `min_stock` units.
    ///
    /// Branches without a stock row are skipped. Empty when `min_stock` is 0.
    pub fn low_stock_branches(&self) -> Vec<String> {
        if self.min_stock <= 0 {
            return Vec::new();
        }
        self.stock
            .iter()
            .filter(|(_, qty)| **qty < self.min_stock)
            .map(|(branch_id, _)| branch_id.clone())
            .collect()
    }

    /// Next free position in the promotion sequence.
    pub fn next_promotion_position(&self) -> i64 {
        self.promotional_pricing
            .iter()
            .map(|p| p.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// Next free position in the volume discount sequence.
    pub fn next_volume_discount_position(&self) -> i64 {
        self.volume_discounts
            .iter()
            .map(|v| v.position + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Editable product fields, used for both create and full-replace update.
///
/// `sku` and `barcode` are generated on create when `None`. On update they
/// may be echoed back but never changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductInput {
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub brand_id: String,
    pub compatible_models: Vec<String>,
    pub unit_of_measure: String,
    pub purchase_price: Money,
    pub price_levels: PriceLevels,
    pub technical_specs: BTreeMap<String, String>,
    pub storage_location: Option<String>,
    pub tags: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    pub min_stock: i64,
    /// `None` keeps the current flag on update and means active on create.
    pub is_active: Option<bool>,
}

/// Product list filters. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

// =============================================================================
// Branch
// =============================================================================

/// A physical store or warehouse holding stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    /// Short unique code printed on transfer slips, e.g. `JKT-01`.
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager_name: Option<String>,
    pub manager_phone: Option<String>,
    pub operating_hours: Option<String>,
    /// Advisory ceiling in units. Reported, never enforced.
    pub stock_capacity: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchInput {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager_name: Option<String>,
    pub manager_phone: Option<String>,
    pub operating_hours: Option<String>,
    pub stock_capacity: i64,
    pub is_active: Option<bool>,
}

// =============================================================================
// Category & Brand
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Roles & Users
// =============================================================================

/// A named permission set. System roles are seeded at init.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    /// Seeded roles can be edited but never deleted or renamed.
    pub is_system: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleInput {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// A staff account. The password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role_id: String,
    pub branch_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Company
// =============================================================================

/// Singleton store profile printed on receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Company {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
