//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Minor Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PRICES, LINE TOTALS AND ORDER TOTALS                                   │
//! │                                                                         │
//! │  Floating point:                                                        │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ totals drift                     │
//! │                                                                         │
//! │  Minor units (i64):                                                     │
//! │    1000 × 2 + 500 × 1 = 2500        ✓ exact, comparable, summable       │
//! │                                                                         │
//! │  Storage keeps the same integer; only the counter formats it.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use apotheca_core::money::Money;
//!
//! let price = Money::from_minor(1099);
//! let line = price.checked_times(3).unwrap();
//! assert_eq!(line.minor_units(), 3297);
//!
//! let total: Money = [line, Money::from_minor(3)].into_iter().sum();
//! assert_eq!(total.minor_units(), 3300);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Stored as `INTEGER` in SQLite; `transparent` makes the column decode
/// straight into `Money`.
///
/// ```text
/// Product.unit_price ──► OrderItem.unit_price (snapshot at checkout)
///                             │
///                             ▼
///                  unit_price × quantity = line total
///                             │
///                             ▼
///                  Σ line totals = Order.total_amount ──► Payment.amount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion for a currency with `exponent` decimals.
    ///
    /// ```rust
    /// use apotheca_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).major_part(2), 10);
    /// assert_eq!(Money::from_minor(25000).major_part(0), 25000);
    /// ```
    pub const fn major_part(&self, exponent: u32) -> i64 {
        self.0 / 10_i64.pow(exponent)
    }

    /// Returns the fractional portion (always non-negative).
    pub const fn minor_part(&self, exponent: u32) -> i64 {
        (self.0 % 10_i64.pow(exponent)).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Paracetamol 500mg, 1000 per box
    /// Quantity: 2
    ///      │
    ///      ▼
    /// checked_times(2) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line total: 2000
    /// ```
    #[inline]
    pub const fn checked_times(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering with two fractional digits, no currency symbol.
///
/// The counter formats with the configured currency instead.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02}",
            sign,
            self.major_part(2).abs(),
            self.minor_part(2)
        )
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
