//! # Money Module
//!
//! Integer-cents money for line prices, amounts and settlement figures.
//!
//! ## Where Money Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product.price_cents ──► DraftLine.unit_price_cents                     │
//! │                                   │                                     │
//! │                         × quantity (synced from unit codes)             │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                      CommittedLine.amount_cents                         │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │            amount_paid_cents ──► SettlementStatus (paid/partial/unpaid) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockscan_core::money::Money;
//!
//! let unit_price = Money::from_cents(49_900);
//! let amount = unit_price.multiply_quantity(2);
//! assert_eq!(amount.cents(), 99_800);
//! assert_eq!(amount.to_string(), "998.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

/// A monetary value in the smallest currency unit.
///
/// Signed so that refunds and negative balances stay representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
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

    /// Multiplies money by a quantity.
    ///
    /// Saturates instead of overflowing; quantities are bounded by
    /// [`crate::MAX_LINE_QUANTITY`] long before that matters.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

/// Display shows major units with two decimals, without a currency symbol.
///
/// Stores run in different currencies; the front end adds the symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
