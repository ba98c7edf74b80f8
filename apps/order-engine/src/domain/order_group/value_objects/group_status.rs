//! Aggregate status of an order group.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the group as a whole, derived from its legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    /// No leg has left Created (waiting on submission or a trigger).
    Pending,
    /// At least one leg is live at the exchange or has filled.
    Active,
    /// Ended with some, but not all, quantity filled.
    PartiallyDone,
    /// Ended with the intended outcome.
    Completed,
    /// Ended by cancellation (user, cascade or expiry).
    Cancelled,
    /// Ended because a required leg was rejected.
    Failed,
}

impl GroupStatus {
    /// Returns true once no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PartiallyDone | Self::Completed | Self::Cancelled | Self::Failed
        )
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::PartiallyDone => write!(f, "PARTIALLY_DONE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!GroupStatus::Pending.is_terminal());
        assert!(!GroupStatus::Active.is_terminal());
        assert!(GroupStatus::PartiallyDone.is_terminal());
        assert!(GroupStatus::Completed.is_terminal());
        assert!(GroupStatus::Cancelled.is_terminal());
        assert!(GroupStatus::Failed.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        let json = serde_json::to_string(&GroupStatus::PartiallyDone).unwrap();
        assert_eq!(json, format!("\"{}\"", GroupStatus::PartiallyDone));
    }
}
