//! # Margin & Valuation Report
//!
//! Derived financial view of the catalog: margin per price level, stock
//! valued at cost, and store-wide summary figures.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per product                                                            │
//! │    margins[level] = { price, profit = price − purchase,                 │
//! │                       margin_bps = profit × 10000 / price }             │
//! │    stock_value    = purchase_price × total_stock   (cost, not retail)   │
//! │                                                                         │
//! │  Summary                                                                │
//! │    total_stock_value = Σ stock_value                                    │
//! │    average_margins   = mean margin_bps per level (products defining it) │
//! │                                                                         │
//! │  Branches                                                               │
//! │    total_units vs stock_capacity → over_capacity flag                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached: the caller hands in one consistent snapshot and the
//! report is recomputed from it. Totals are accumulated in i128; a figure
//! that does not fit back into i64 fails the report with `ValueOverflow`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{div_round_half_up, Money, FULL_BPS};
use crate::types::{Branch, Product, ProductStatus};

// =============================================================================
// Report Types
// =============================================================================

/// Margin of one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LevelMargin {
    pub price: Money,
    pub profit: Money,
    /// Profit as a share of the selling price, in basis points.
    /// `None` when the price is zero.
    pub margin_bps: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductValuation {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    pub purchase_price: Money,
    pub margins: BTreeMap<String, LevelMargin>,
    pub total_stock: i64,
    pub stock_value: Money,
    /// Levels priced under purchase cost. A warning, never a rejection.
    pub below_cost_levels: Vec<String>,
    pub min_stock: i64,
    /// `total_stock <= min_stock` (with a non-zero threshold).
    pub low_stock: bool,
    /// Branches holding strictly fewer than `min_stock` units.
    pub low_stock_branches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportSummary {
    pub total_products: i64,
    pub total_stock_units: i64,
    pub total_stock_value: Money,
    /// Level → mean `margin_bps`, rounded half-up.
    pub average_margins: BTreeMap<String, i64>,
    pub low_stock_count: i64,
    /// Products with at least one level below cost.
    pub negative_margin_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchStock {
    pub branch_id: String,
    pub code: String,
    pub name: String,
    pub total_units: i64,
    pub stock_capacity: i64,
    pub over_capacity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginReport {
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub products: Vec<ProductValuation>,
    pub summary: ReportSummary,
    pub branches: Vec<BranchStock>,
}

// =============================================================================
// Calculations
// =============================================================================

/// Margin of selling at `price` something bought at `purchase_price`.
///
/// ```rust
/// use motopos_core::money::Money;
/// use motopos_core::report::level_margin;
///
/// let m = level_margin(Money::from_cents(10000), Money::from_cents(6000));
/// assert_eq!(m.profit.cents(), 4000);
/// assert_eq!(m.margin_bps, Some(4000)); // 40.00%
///
/// let free = level_margin(Money::zero(), Money::from_cents(6000));
/// assert_eq!(free.margin_bps, None);
/// ```
pub fn level_margin(price: Money, purchase_price: Money) -> LevelMargin {
    let profit = price - purchase_price;
    let margin_bps = if price.is_zero() {
        None
    } else {
        let scaled = profit.cents() as i128 * FULL_BPS as i128;
        Some(div_round_half_up(scaled, price.cents() as i128) as i64)
    };

    LevelMargin {
        price,
        profit,
        margin_bps,
    }
}

/// Valuation line for one product.
///
/// Fails with `ValueOverflow` when the stock value leaves the i64 range.
pub fn value_product(product: &Product) -> CoreResult<ProductValuation> {
    let margins: BTreeMap<String, LevelMargin> = product
        .price_levels
        .iter()
        .map(|(level, price)| (level.clone(), level_margin(*price, product.purchase_price)))
        .collect();

    let below_cost_levels = margins
        .iter()
        .filter(|(_, m)| m.profit.is_negative())
        .map(|(level, _)| level.clone())
        .collect();

    Ok(ProductValuation {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        name: product.name.clone(),
        status: product.status(),
        purchase_price: product.purchase_price,
        margins,
        total_stock: product.total_stock(),
        stock_value: product.stock_value()?,
        below_cost_levels,
        min_stock: product.min_stock,
        low_stock: product.is_low_stock(),
        low_stock_branches: product.low_stock_branches(),
    })
}

/// Builds the full report from one snapshot of products and branches.
///
/// Tombstoned products are skipped unless `include_deleted` is set. Branch
/// totals always count live products only.
pub fn build_margin_report(
    products: &[Product],
    branches: &[Branch],
    include_deleted: bool,
    generated_at: DateTime<Utc>,
) -> CoreResult<MarginReport> {
    let lines = products
        .iter()
        .filter(|p| include_deleted || !p.is_deleted())
        .map(value_product)
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(MarginReport {
        generated_at,
        summary: summarize(&lines)?,
        branches: branch_totals(products, branches)?,
        products: lines,
    })
}

fn narrow(value: i128, field: &str) -> CoreResult<i64> {
    i64::try_from(value).map_err(|_| CoreError::value_overflow(field))
}

fn summarize(lines: &[ProductValuation]) -> CoreResult<ReportSummary> {
    let mut summary = ReportSummary {
        total_products: lines.len() as i64,
        ..Default::default()
    };
    let mut units: i128 = 0;
    let mut value: i128 = 0;
    let mut margin_sums: BTreeMap<&str, (i128, i128)> = BTreeMap::new();

    for line in lines {
        units += line.total_stock as i128;
        value += line.stock_value.cents() as i128;
        if line.low_stock {
            summary.low_stock_count += 1;
        }
        if !line.below_cost_levels.is_empty() {
            summary.negative_margin_count += 1;
        }
        for (level, margin) in &line.margins {
            if let Some(bps) = margin.margin_bps {
                let entry = margin_sums.entry(level.as_str()).or_insert((0, 0));
                entry.0 += bps as i128;
                entry.1 += 1;
            }
        }
    }

    summary.average_margins = margin_sums
        .into_iter()
        .map(|(level, (sum, count))| (level.to_string(), div_round_half_up(sum, count) as i64))
        .collect();
    summary.total_stock_units = narrow(units, "total_stock_units")?;
    summary.total_stock_value = Money::from_cents(narrow(value, "total_stock_value")?);

    Ok(summary)
}

fn branch_totals(products: &[Product], branches: &[Branch]) -> CoreResult<Vec<BranchStock>> {
    branches
        .iter()
        .map(|branch| {
            let units: i128 = products
                .iter()
                .filter(|p| !p.is_deleted())
                .map(|p| p.stock_at(&branch.id) as i128)
                .sum();
            let total_units = narrow(units, "branch total_units")?;
            Ok(BranchStock {
                branch_id: branch.id.clone(),
                code: branch.code.clone(),
                name: branch.name.clone(),
                total_units,
                stock_capacity: branch.stock_capacity,
                over_capacity: branch.stock_capacity > 0 && total_units > branch.stock_capacity,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
