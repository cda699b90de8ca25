//! # Pricing Model
//!
//! Resolves what one unit of a product costs the customer for a given price
//! level, quantity and moment in time.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  effective_price(product, "retail", qty = 10, at)                       │
//! │                                                                         │
//! │  1. Promotion check                                                     │
//! │     active && start ≤ at ≤ end && defines "retail"?                    │
//! │        ├── yes: last such promotion (insertion order) sets the base    │
//! │        └── no:  product.price_levels["retail"]                          │
//! │                   └── missing → UnknownPriceLevel                       │
//! │                                                                         │
//! │  2. Volume tier                                                          │
//! │     active && min_quantity ≤ qty, largest min_quantity wins            │
//! │     (ties: the later-added tier)                                        │
//! │        ├── percentage: base × (10000 − bps) / 10000                     │
//! │        └── fixed:      max(base − value, 0)                             │
//! │                                                                         │
//! │  3. Round half-up to the cent, once                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promotions and tiers layer: a promotional base still gets the volume
//! discount. Everything here is pure; the caller passes `at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    DiscountType, NewPromotion, NewVolumeDiscount, Product, PromotionalPricing, VolumeDiscount,
};
use crate::validation::{validate_new_promotion, validate_new_volume_discount, validate_quantity};

// =============================================================================
// Quote Types
// =============================================================================

/// The promotion that supplied the base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedPromotion {
    pub position: i64,
    pub name: String,
}

/// The volume tier that discounted the base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedVolumeDiscount {
    pub position: i64,
    pub min_quantity: i64,
    pub discount_type: DiscountType,
    pub discount_value: i64,
}

/// Breakdown of an effective price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    pub product_id: String,
    pub price_level: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
    /// Regular price of the level, when the product defines it.
    pub list_price: Option<Money>,
    /// Price the volume tier was applied to.
    pub base_price: Money,
    pub promotion: Option<AppliedPromotion>,
    pub volume_discount: Option<AppliedVolumeDiscount>,
    pub unit_price: Money,
    /// `unit_price × quantity`.
    pub line_total: Money,
}

// =============================================================================
// Effective Price
// =============================================================================

/// Returns the unit price for `quantity` units at `price_level` at `at`.
///
/// ## Errors
/// - `Validation` when `quantity < 1`
/// - `UnknownPriceLevel` when neither an in-effect promotion nor the product
///   defines the level
/// - `ValueOverflow` when `unit_price × quantity` does not fit in cents
///
/// ## Example
/// ```rust,ignore
/// // retail 100.00 with a 15% tier from 10 units
/// assert_eq!(effective_price(&product, "retail", 10, now)?.cents(), 8500);
/// assert_eq!(effective_price(&product, "retail", 9, now)?.cents(), 10000);
/// ```
pub fn effective_price(
    product: &Product,
    price_level: &str,
    quantity: i64,
    at: DateTime<Utc>,
) -> CoreResult<Money> {
    quote(product, price_level, quantity, at).map(|q| q.unit_price)
}

/// Like [`effective_price`], with the steps that produced the number.
pub fn quote(
    product: &Product,
    price_level: &str,
    quantity: i64,
    at: DateTime<Utc>,
) -> CoreResult<PriceQuote> {
    validate_quantity(quantity)?;

    let list_price = product.price_level(price_level);
    let promotion = active_promotion(product, price_level, at);

    let base_price = match (promotion, list_price) {
        (Some(promo), _) => promo
            .price_levels
            .get(price_level)
            .copied()
            .unwrap_or_default(),
        (None, Some(price)) => price,
        (None, None) => {
            return Err(CoreError::UnknownPriceLevel {
                sku: product.sku.clone(),
                level: price_level.to_string(),
            })
        }
    };

    let tier = applicable_volume_discount(product, quantity);
    let unit_price = match tier {
        Some(tier) => apply_volume_discount(base_price, tier),
        None => base_price,
    };

    let line_total = unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| CoreError::value_overflow("line_total"))?;

    Ok(PriceQuote {
        product_id: product.id.clone(),
        price_level: price_level.to_string(),
        quantity,
        at,
        list_price,
        base_price,
        promotion: promotion.map(|p| AppliedPromotion {
            position: p.position,
            name: p.name.clone(),
        }),
        volume_discount: tier.map(|t| AppliedVolumeDiscount {
            position: t.position,
            min_quantity: t.min_quantity,
            discount_type: t.discount_type,
            discount_value: t.discount_value,
        }),
        unit_price,
        line_total,
    })
}

/// The in-effect promotion that prices `price_level`, latest insertion first.
pub fn active_promotion<'a>(
    product: &'a Product,
    price_level: &str,
    at: DateTime<Utc>,
) -> Option<&'a PromotionalPricing> {
    product
        .promotional_pricing
        .iter()
        .filter(|p| p.is_in_effect(at) && p.price_levels.contains_key(price_level))
        .max_by_key(|p| p.position)
}

/// The active tier with the largest `min_quantity` not above `quantity`.
pub fn applicable_volume_discount(product: &Product, quantity: i64) -> Option<&VolumeDiscount> {
    product
        .volume_discounts
        .iter()
        .filter(|t| t.is_active && t.min_quantity <= quantity)
        .max_by_key(|t| (t.min_quantity, t.position))
}

/// Applies one tier to a base price. The result is never negative.
pub fn apply_volume_discount(base: Money, tier: &VolumeDiscount) -> Money {
    match tier.discount_type {
        DiscountType::Percentage => {
            let bps = tier.discount_value.clamp(0, u32::MAX as i64) as u32;
            base.apply_percentage_discount(bps).max(Money::zero())
        }
        DiscountType::Fixed => base.saturating_discount(Money::from_cents(tier.discount_value)),
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Validates and appends a promotion, returning the stored entry.
pub fn add_promotion(
    product: &mut Product,
    input: NewPromotion,
    now: DateTime<Utc>,
) -> CoreResult<PromotionalPricing> {
    validate_new_promotion(&input)?;

    let entry = PromotionalPricing {
        position: product.next_promotion_position(),
        name: input.name.trim().to_string(),
        price_levels: input.price_levels,
        start_date: input.start_date,
        end_date: input.end_date,
        is_active: input.is_active,
        created_at: now,
    };
    product.promotional_pricing.push(entry.clone());
    Ok(entry)
}

/// Validates and appends a volume discount tier, returning the stored entry.
pub fn add_volume_discount(
    product: &mut Product,
    input: NewVolumeDiscount,
    now: DateTime<Utc>,
) -> CoreResult<VolumeDiscount> {
    validate_new_volume_discount(&input)?;

    let entry = VolumeDiscount {
        position: product.next_volume_discount_position(),
        min_quantity: input.min_quantity,
        discount_type: input.discount_type,
        discount_value: input.discount_value,
        is_active: input.is_active,
        created_at: now,
    };
    product.volume_discounts.push(entry.clone());
    Ok(entry)
}

// =============================================================================
// Unit Tests
// =============================================================================
