//! Leg status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single leg.
///
/// ```text
/// Created ──► Submitted ──► PartiallyFilled ──► Filled
///    │            │               │
///    │            ├──► Filled     └──► Cancelled
///    │            ├──► Cancelled
///    │            └──► Rejected
///    ├──► Triggered ──► Submitted
///    └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegStatus {
    /// Leg exists but has not been sent to the exchange.
    Created,
    /// Leg acknowledged by the execution adapter.
    Submitted,
    /// Leg's trigger condition fired; submission in progress.
    Triggered,
    /// Some, but not all, of the ordered quantity has filled.
    PartiallyFilled,
    /// Ordered quantity fully filled.
    Filled,
    /// Leg cancelled.
    Cancelled,
    /// Leg rejected by the adapter or exchange.
    Rejected,
}

impl LegStatus {
    /// Returns true if the leg is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }

    /// Returns true if the leg is live at the exchange.
    #[must_use]
    pub const fn is_working(&self) -> bool {
        matches!(self, Self::Submitted | Self::PartiallyFilled)
    }

    /// Returns true if the leg has not left the engine yet.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Created | Self::Triggered)
    }
}

impl fmt::Display for LegStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Triggered => write!(f, "TRIGGERED"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(LegStatus::Filled.is_terminal());
        assert!(LegStatus::Cancelled.is_terminal());
        assert!(LegStatus::Rejected.is_terminal());
        assert!(!LegStatus::PartiallyFilled.is_terminal());
        assert!(!LegStatus::Triggered.is_terminal());
    }

    #[test]
    fn working_and_local() {
        assert!(LegStatus::Submitted.is_working());
        assert!(LegStatus::PartiallyFilled.is_working());
        assert!(!LegStatus::Created.is_working());
        assert!(LegStatus::Created.is_local());
        assert!(LegStatus::Triggered.is_local());
        assert!(!LegStatus::Submitted.is_local());
    }
}
