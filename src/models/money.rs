//! Money type for representing currency amounts
//!
//! Internally stores amounts in cents (i64) to avoid floating-point precision
//! issues. All arithmetic is overflow-checked against an explicit maximum so
//! a bad balance computation fails loudly instead of wrapping or saturating.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The largest magnitude a [`Money`] value may hold, in minor units (cents).
///
/// 10^15 cents = ten trillion currency units. Any computed result whose
/// magnitude exceeds this is reported as [`MoneyOverflow`] rather than stored.
pub const MAX_MINOR_UNITS: i64 = 1_000_000_000_000_000;

/// Error returned when an arithmetic result leaves the representable range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("monetary amount exceeds the representable range")]
pub struct MoneyOverflow;

/// Represents a monetary amount stored as cents (hundredths of the currency unit)
///
/// Negative values are permitted: a budget's remaining amount can legally go
/// below zero. Rejecting non-positive *user input* is the ledger service's
/// job, not this type's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from cents
    ///
    /// # Examples
    /// ```
    /// use tallybook::models::Money;
    /// let amount = Money::from_cents(1050); // 10.50
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a Money amount from cents, rejecting out-of-range magnitudes
    pub fn try_from_cents(cents: i64) -> Result<Self, MoneyOverflow> {
        check_range(cents).map(Self)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Get the whole units portion (truncated toward zero)
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Get the cents portion (0-99)
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Check whether the amount fits the representable range
    pub const fn is_in_range(&self) -> bool {
        self.0 <= MAX_MINOR_UNITS && self.0 >= -MAX_MINOR_UNITS
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyOverflow> {
        let cents = self.0.checked_add(other.0).ok_or(MoneyOverflow)?;
        check_range(cents).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyOverflow> {
        let cents = self.0.checked_sub(other.0).ok_or(MoneyOverflow)?;
        check_range(cents).map(Self)
    }

    /// Checked multiplication by a scalar (e.g. a number of months)
    pub fn checked_mul(self, factor: u32) -> Result<Self, MoneyOverflow> {
        let cents = self.0.checked_mul(i64::from(factor)).ok_or(MoneyOverflow)?;
        check_range(cents).map(Self)
    }

    /// Checked sum over an iterator of amounts
    pub fn checked_sum<I: IntoIterator<Item = Self>>(iter: I) -> Result<Self, MoneyOverflow> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

fn check_range(cents: i64) -> Result<i64, MoneyOverflow> {
    if (-MAX_MINOR_UNITS..=MAX_MINOR_UNITS).contains(&cents) {
        Ok(cents)
    } else {
        Err(MoneyOverflow)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}
