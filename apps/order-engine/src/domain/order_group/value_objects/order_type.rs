//! Exchange order types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type sent to the exchange for a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order.
    Market,
    /// Limit order.
    Limit,
    /// Stop-loss limit: becomes a limit order once the trigger price trades.
    StopLoss,
    /// Stop-loss market: becomes a market order once the trigger price trades.
    StopLossMarket,
}

impl OrderType {
    /// Returns true if the order type needs a limit price.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLoss)
    }

    /// Returns true if the exchange needs a trigger price for this type.
    #[must_use]
    pub const fn requires_trigger(&self) -> bool {
        matches!(self, Self::StopLoss | Self::StopLossMarket)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::StopLoss => write!(f, "SL"),
            Self::StopLossMarket => write!(f, "SL-M"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_requirements() {
        assert!(!OrderType::Market.requires_price());
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::StopLoss.requires_price());
        assert!(!OrderType::StopLossMarket.requires_price());
        assert!(OrderType::StopLossMarket.requires_trigger());
        assert!(!OrderType::Limit.requires_trigger());
    }
}
