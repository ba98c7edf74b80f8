//! Leg modification request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::shared::{Price, Quantity};

/// Fields a client may change on an unfilled leg. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegModification {
    /// New limit price.
    #[serde(default)]
    pub price: Option<Price>,
    /// New trigger price.
    #[serde(default)]
    pub trigger_price: Option<Price>,
    /// New trailing distance.
    #[serde(default)]
    pub trailing_offset: Option<Decimal>,
    /// New quantity.
    #[serde(default)]
    pub quantity: Option<Quantity>,
}

impl LegModification {
    /// Returns true if nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.trigger_price.is_none()
            && self.trailing_offset.is_none()
            && self.quantity.is_none()
    }

    /// Validate the values supplied.
    ///
    /// # Errors
    ///
    /// Returns error if the request is empty or a supplied value is not positive.
    pub fn validate(&self) -> Result<(), OrderGroupError> {
        if self.is_empty() {
            return Err(invalid("modification", "nothing to modify"));
        }
        if self.price.is_some_and(|p| !p.is_positive()) {
            return Err(invalid("price", "must be positive"));
        }
        if self.trigger_price.is_some_and(|p| !p.is_positive()) {
            return Err(invalid("trigger_price", "must be positive"));
        }
        if self.trailing_offset.is_some_and(|o| o <= Decimal::ZERO) {
            return Err(invalid("trailing_offset", "must be positive"));
        }
        if self.quantity.is_some_and(|q| !q.is_positive()) {
            return Err(invalid("quantity", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> OrderGroupError {
    OrderGroupError::InvalidParameters {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_modification_is_invalid() {
        assert!(LegModification::default().validate().is_err());
    }

    #[test]
    fn negative_trailing_offset_is_invalid() {
        let m = LegModification {
            trailing_offset: Some(Decimal::NEGATIVE_ONE),
            ..LegModification::default()
        };
        assert!(m.validate().unwrap_err().is_validation());
    }

    #[test]
    fn price_change_is_valid() {
        let m = LegModification {
            price: Some(Price::from_i64(101)),
            ..LegModification::default()
        };
        assert!(m.validate().is_ok());
    }
}
