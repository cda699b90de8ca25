//! # Validation Module
//!
//! Input validation utilities for Moto POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP edge (apps/api)                                         │
//! │  ├── JSON shape (deserialization)                                      │
//! │  └── Decimal → cents conversion                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Business rule validation (formats, ranges, retail level)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (sku, barcode, branch code)                    │
//! │  └── CHECK / foreign key constraints                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use motopos_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("PRD-482913-K7Q").is_ok());
//! assert!(validate_quantity(10).is_ok());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::money::{Money, FULL_BPS};
use crate::types::{
    BranchInput, DiscountType, NewPromotion, NewVolumeDiscount, PriceLevels, ProductInput,
    RETAIL_LEVEL,
};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Only ASCII letters, digits, hyphens, underscores
///
/// ## Example
/// ```rust
/// use motopos_core::validation::validate_sku;
///
/// assert!(validate_sku("PRD-482913-K7Q").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a barcode.
///
/// ## Rules
/// - 10 to 32 ASCII letters or digits
///
/// Generated barcodes are always 13 digits; supplier barcodes (Code 128
/// labels on imported parts) can be alphanumeric.
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(required("barcode"));
    }
    if barcode.len() < 10 {
        return Err(ValidationError::TooShort {
            field: "barcode".to_string(),
            min: 10,
        });
    }
    if barcode.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 32,
        });
    }
    if !barcode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, category, brand, branch, role).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ```rust
/// use motopos_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Oil Filter Yamaha NMAX").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates that a reference field (category, brand, branch, role) is set.
pub fn validate_reference(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a pricing quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ```rust
/// use motopos_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a monetary amount that may be zero but never negative.
///
/// The upper bound is [`MAX_AMOUNT_CENTS`]; the error reports it in major
/// units, the way clients send prices.
///
/// ```rust
/// use motopos_core::money::Money;
/// use motopos_core::validation::validate_non_negative_money;
///
/// assert!(validate_non_negative_money("purchase_price", Money::from_cents(0)).is_ok());
/// assert!(validate_non_negative_money("purchase_price", Money::from_cents(-1)).is_err());
/// assert!(validate_non_negative_money("purchase_price", Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_non_negative_money(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS / 100,
        });
    }
    Ok(())
}

/// Validates a price level map.
///
/// ## Rules
/// - Level names are non-empty
/// - Every price is non-negative
/// - `retail` must be present when `require_retail` is set
pub fn validate_price_levels(
    field: &str,
    levels: &PriceLevels,
    require_retail: bool,
) -> ValidationResult<()> {
    if require_retail && !levels.contains_key(RETAIL_LEVEL) {
        return Err(ValidationError::Required {
            field: format!("{field}.{RETAIL_LEVEL}"),
        });
    }

    for (level, price) in levels {
        if level.trim().is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "price level names must not be empty".to_string(),
            });
        }
        validate_non_negative_money(&format!("{field}.{level}"), *price)?;
    }

    Ok(())
}

/// Validates a percentage in basis points (0 to 10000).
pub fn validate_percentage_bps(field: &str, bps: i64) -> ValidationResult<()> {
    if !(0..=FULL_BPS).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: FULL_BPS,
        });
    }
    Ok(())
}

/// Validates an absolute stock quantity (0 to [`MAX_STOCK_QUANTITY`]).
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    validate_stock_count("stock_quantity", qty)
}

/// Validates a per-branch unit count such as a stock level or `min_stock`.
pub fn validate_stock_count(field: &str, value: i64) -> ValidationResult<()> {
    validate_non_negative(field, value)?;
    if value > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a non-negative counter such as `min_stock` or `stock_capacity`.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that `end` comes strictly after `start`.
pub fn validate_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<()> {
    if end <= start {
        return Err(ValidationError::InvalidDateRange {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates the editable fields of a product.
///
/// Reference existence (category, brand) is checked by the caller against
/// storage; this only checks the fields are present.
pub fn validate_product_input(input: &ProductInput) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_reference("category_id", &input.category_id)?;
    validate_reference("brand_id", &input.brand_id)?;
    if let Some(sku) = &input.sku {
        validate_sku(sku)?;
    }
    if let Some(barcode) = &input.barcode {
        validate_barcode(barcode)?;
    }
    validate_non_negative_money("purchase_price", input.purchase_price)?;
    validate_price_levels("price_levels", &input.price_levels, true)?;
    validate_stock_count("min_stock", input.min_stock)?;
    Ok(())
}

/// Validates a promotion before it is appended.
pub fn validate_new_promotion(promo: &NewPromotion) -> ValidationResult<()> {
    validate_name("name", &promo.name)?;
    validate_date_range(promo.start_date, promo.end_date)?;
    if promo.price_levels.is_empty() {
        return Err(required("price_levels"));
    }
    validate_price_levels("price_levels", &promo.price_levels, false)
}

/// Validates a volume discount tier before it is appended.
pub fn validate_new_volume_discount(tier: &NewVolumeDiscount) -> ValidationResult<()> {
    if tier.min_quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "min_quantity".to_string(),
        });
    }
    match tier.discount_type {
        DiscountType::Percentage => validate_percentage_bps("discount_value", tier.discount_value),
        DiscountType::Fixed => {
            validate_non_negative_money("discount_value", Money::from_cents(tier.discount_value))
        }
    }
}

/// Validates branch fields.
pub fn validate_branch_input(input: &BranchInput) -> ValidationResult<()> {
    validate_name("code", &input.code)?;
    if input.code.trim().chars().count() > 20 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 20,
        });
    }
    validate_name("name", &input.name)?;
    validate_non_negative("stock_capacity", input.stock_capacity)
}
