//! # Stock Movements
//!
//! Every write to the per-branch stock ledger leaves a movement row behind,
//! so a branch count can always be explained after the fact.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation            Movement rows                                     │
//! │  ───────────────────  ───────────────────────────────────────────────── │
//! │  set (stock opname)   SET          before → after (absolute count)      │
//! │  adjust IN / OUT      ADJUSTMENT   before → before ± quantity           │
//! │  transfer A → B       TRANSFER_OUT at A, TRANSFER_IN at B               │
//! │                       (same transaction, each names the other branch)   │
//! │                                                                         │
//! │  Invariant: after ≥ 0 and after ≤ MAX_STOCK_QUANTITY on every row.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module only does the arithmetic. Persisting the rows and the new
//! counts in one transaction is the catalog's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{validate_stock_count, ValidationResult};

/// Longest free-text reason kept on a movement.
pub const MAX_REASON_LENGTH: usize = 200;

// =============================================================================
// Types
// =============================================================================

/// What produced a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Absolute count written by a stock take.
    Set,
    /// Relative IN/OUT correction.
    Adjustment,
    TransferOut,
    TransferIn,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Set => "set",
            MovementKind::Adjustment => "adjustment",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::TransferIn => "transfer_in",
        }
    }
}

/// Direction of a manual adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustDirection {
    In,
    Out,
}

/// One recorded change to a (product, branch) count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: String,
    pub branch_id: String,
    pub kind: MovementKind,
    pub quantity_before: i64,
    pub quantity_after: i64,
    /// Other side of a transfer.
    pub counterpart_branch_id: Option<String>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed change in units.
    pub fn delta(&self) -> i64 {
        self.quantity_after - self.quantity_before
    }
}

/// A movement not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockMovement {
    pub product_id: String,
    pub branch_id: String,
    pub kind: MovementKind,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub counterpart_branch_id: Option<String>,
    pub reason: Option<String>,
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Count after moving `quantity` units in `direction`.
///
/// ## Errors
/// - `Validation` when `quantity` is not in `1..=MAX_STOCK_QUANTITY` or the
///   result leaves that range
/// - `InsufficientStock` when an OUT takes more than `current`
///
/// ```rust
/// use motopos_core::stock::{apply_adjustment, AdjustDirection};
///
/// assert_eq!(apply_adjustment("b1", 10, AdjustDirection::In, 5).unwrap(), 15);
/// assert_eq!(apply_adjustment("b1", 10, AdjustDirection::Out, 10).unwrap(), 0);
/// assert!(apply_adjustment("b1", 10, AdjustDirection::Out, 11).is_err());
/// ```
pub fn apply_adjustment(
    branch_id: &str,
    current: i64,
    direction: AdjustDirection,
    quantity: i64,
) -> CoreResult<i64> {
    validate_movement_quantity(quantity)?;
    let after = match direction {
        AdjustDirection::In => current.checked_add(quantity),
        AdjustDirection::Out => {
            if quantity > current {
                return Err(CoreError::InsufficientStock {
                    branch_id: branch_id.to_string(),
                    available: current,
                    requested: quantity,
                });
            }
            Some(current - quantity)
        }
    }
    .ok_or_else(|| CoreError::value_overflow("stock_quantity"))?;

    validate_stock_count("stock_quantity", after)?;
    Ok(after)
}

/// Counts at source and destination after moving `quantity` units.
///
/// ## Errors
/// - `Validation` when the branches are the same or `quantity` is out of range
/// - `InsufficientStock` when the source holds fewer than `quantity`
pub fn plan_transfer(
    from_branch_id: &str,
    from_current: i64,
    to_branch_id: &str,
    to_current: i64,
    quantity: i64,
) -> CoreResult<(i64, i64)> {
    if from_branch_id == to_branch_id {
        return Err(ValidationError::InvalidFormat {
            field: "to_branch_id".to_string(),
            reason: "must differ from from_branch_id".to_string(),
        }
        .into());
    }
    let from_after = apply_adjustment(from_branch_id, from_current, AdjustDirection::Out, quantity)?;
    let to_after = apply_adjustment(to_branch_id, to_current, AdjustDirection::In, quantity)?;
    Ok((from_after, to_after))
}

/// Trims a reason, dropping it when blank.
pub fn normalize_reason(reason: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LENGTH,
        });
    }
    Ok(Some(reason.to_string()))
}

fn validate_movement_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    validate_stock_count("quantity", quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================
