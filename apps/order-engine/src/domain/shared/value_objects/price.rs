//! Price value object for limit, trigger and fill prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use crate::domain::shared::DomainError;

/// A per-unit price in the instrument's quote currency.
///
/// Represented as a Decimal for precise tick arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Price from an integer number of whole units.
    #[must_use]
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::new(amount, 0))
    }

    /// Create a Price from a scaled integer (`paise(9_950)` is 99.50).
    #[must_use]
    pub fn paise(amount: i64) -> Self {
        Self(Decimal::new(amount, 2))
    }

    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this price is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Validate price for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if the price is zero or negative.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 <= Decimal::ZERO {
            return Err(DomainError::invalid("price", "Price must be positive"));
        }
        Ok(())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add<Decimal> for Price {
    type Output = Self;

    fn add(self, rhs: Decimal) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<Decimal> for Price {
    type Output = Self;

    fn sub(self, rhs: Decimal) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_display_two_decimals() {
        assert_eq!(format!("{}", Price::from_i64(95)), "95.00");
        assert_eq!(format!("{}", Price::paise(9_950)), "99.50");
    }

    #[test]
    fn price_offset_arithmetic() {
        let p = Price::from_i64(101);
        assert_eq!(p - dec!(2), Price::from_i64(99));
        assert_eq!(p + dec!(2), Price::from_i64(103));
    }

    #[test]
    fn price_ordering() {
        assert!(Price::from_i64(99) < Price::from_i64(100));
        assert_eq!(Price::from_i64(99).max(Price::from_i64(95)), Price::from_i64(99));
    }

    #[test]
    fn validate_for_order() {
        assert!(Price::from_i64(10).validate_for_order().is_ok());
        assert!(Price::ZERO.validate_for_order().is_err());
        assert!(Price::from_i64(-1).validate_for_order().is_err());
    }
}
