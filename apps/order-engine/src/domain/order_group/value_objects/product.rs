//! Product (margin) type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Margin product an order is placed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Intraday margin; squared off the same session.
    Intraday,
    /// Cash-and-carry delivery.
    Delivery,
    /// Normal (carry-forward) derivatives margin.
    Normal,
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intraday => write!(f, "INTRADAY"),
            Self::Delivery => write!(f, "DELIVERY"),
            Self::Normal => write!(f, "NORMAL"),
        }
    }
}
