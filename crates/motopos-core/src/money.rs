//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats, a 15% volume discount on 19.99:                           │
//! │    19.99 * 0.85 = 16.991499999999998  → rounds to 16.99  ❌             │
//! │                                                                         │
//! │  The exact answer is 16.9915, which must round HALF-UP to 16.99 ...    │
//! │  ... but 1.005 * 100 in floats is 100.49999 and rounds the wrong way.  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Basis Points                             │
//! │    1999 cents * (10000 - 1500) bps / 10000 = 1699.15 → 1699 cents      │
//! │    One rounding step, done in integers, at the very end.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use motopos_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(10000); // 100.00
//!
//! // 15% volume tier
//! let discounted = price.apply_percentage_discount(1500);
//! assert_eq!(discounted.cents(), 8500);
//!
//! // Fixed discounts never go below zero
//! let floored = Money::from_cents(500).saturating_discount(Money::from_cents(800));
//! assert!(floored.is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

/// One hundred percent, expressed in basis points.
pub const FULL_BPS: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: profits and margins can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support; serialized as integer cents
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.purchase_price ──────────────┬──► Margin report (profit)       │
/// │                                       └──► Stock value (cost × units)   │
/// │                                                                         │
/// │  Product.price_levels["retail"] ──┐                                     │
/// │  Promotion.price_levels["retail"] ┴──► effective_price ──► Quote        │
/// │  VolumeDiscount (fixed) ──────────────────┘                             │
/// │                                                                         │
/// │  The HTTP edge converts decimals to Money exactly once on the way in,  │
/// │  and back exactly once on the way out.                                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use motopos_core::money::Money;
    ///
    /// let price = Money::from_cents(2999); // Represents 29.99
    /// assert_eq!(price.cents(), 2999);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    ///
    /// ## Example
    /// ```rust
    /// use motopos_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).dollars(), 10);
    /// assert_eq!(Money::from_cents(-550).dollars(), -5);
    /// ```
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use motopos_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(8500);
    /// assert_eq!(unit_price.checked_multiply_quantity(10), Some(Money::from_cents(85000)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    ///
    /// Used for line totals in quotes and for stock valuation
    /// (`purchase_price × total_stock`).
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (1500 = 15%)
    ///
    /// ## Rounding
    /// The discounted price is computed in one step,
    /// `amount × (10000 − bps) / 10000`, and rounded half-up to the cent.
    /// Rounding the discount amount first and subtracting it afterwards can
    /// land one cent off on half-cent results, so this never does that.
    ///
    /// ## Example
    /// ```rust
    /// use motopos_core::money::Money;
    ///
    /// let base = Money::from_cents(10000); // 100.00
    /// assert_eq!(base.apply_percentage_discount(1500).cents(), 8500);
    ///
    /// // 19.99 at 15% off = 16.9915 → 16.99
    /// assert_eq!(Money::from_cents(1999).apply_percentage_discount(1500).cents(), 1699);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let bps = (discount_bps as i64).min(FULL_BPS);
        let scaled = self.0 as i128 * (FULL_BPS - bps) as i128;
        Money::from_cents(div_round_half_up(scaled, FULL_BPS as i128) as i64)
    }

    /// Subtracts a fixed discount, flooring the result at zero.
    ///
    /// ## Example
    /// ```rust
    /// use motopos_core::money::Money;
    ///
    /// let base = Money::from_cents(1000);
    /// assert_eq!(base.saturating_discount(Money::from_cents(250)).cents(), 750);
    /// assert_eq!(base.saturating_discount(Money::from_cents(5000)).cents(), 0);
    /// ```
    #[inline]
    pub fn saturating_discount(&self, discount: Money) -> Money {
        Money(self.0.saturating_sub(discount.0).max(0))
    }
}

// =============================================================================
// Rounding Helper
// =============================================================================

/// Integer division rounding half away from zero.
///
/// For the non-negative values produced by pricing this is plain half-up.
/// Negative numerators (loss-making margins) round symmetrically, so
/// `-2.5` becomes `-3` and the magnitude matches its positive twin.
///
/// ## Example
/// ```rust
/// use motopos_core::money::div_round_half_up;
///
/// assert_eq!(div_round_half_up(25, 10), 3);
/// assert_eq!(div_round_half_up(24, 10), 2);
/// assert_eq!(div_round_half_up(-25, 10), -3);
/// ```
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0, "denominator must be positive");
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs. The HTTP edge renders decimals, not this string.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
