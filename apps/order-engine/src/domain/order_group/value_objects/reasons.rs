//! Reasons for leg rejection and cancellation.
//!
//! Every automatic cascade carries a reason code so the group's history
//! explains why a leg the client never touched was closed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason for leg rejection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RejectReason {
    /// Rejection code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RejectReason {
    /// Create a new reject reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Rejected by the exchange or the adapter's business rules.
    #[must_use]
    pub fn exchange_rejected(message: impl Into<String>) -> Self {
        Self::new("EXCHANGE_REJECTED", message)
    }

    /// The adapter stayed unreachable after all retries.
    #[must_use]
    pub fn adapter_unavailable(message: impl Into<String>) -> Self {
        Self::new("ADAPTER_UNAVAILABLE", message)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Reason for leg or group cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancelReason {
    /// Cancellation code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl CancelReason {
    /// Code for a client-initiated cancel.
    pub const USER_REQUESTED: &'static str = "USER_REQUESTED";
    /// Code for closing the other half of a one-cancels-other pair.
    pub const CASCADE_CANCEL_SIBLING: &'static str = "CASCADE_CANCEL_SIBLING";
    /// Code for exits closed because the entry position was squared off.
    pub const CASCADE_SQUAREOFF_ENTRY: &'static str = "CASCADE_SQUAREOFF_ENTRY";
    /// Code for legs closed because a leg they depend on was rejected.
    pub const CASCADE_DEPENDENCY_REJECTED: &'static str = "CASCADE_DEPENDENCY_REJECTED";
    /// Code for legs closed because a leg they depend on was cancelled.
    pub const CASCADE_DEPENDENCY_CANCELLED: &'static str = "CASCADE_DEPENDENCY_CANCELLED";
    /// Code for iceberg slices closed after slicing halted.
    pub const ICEBERG_HALTED: &'static str = "ICEBERG_HALTED";
    /// Code for groups past their expiry time.
    pub const EXPIRED: &'static str = "EXPIRED";
    /// Code for unsolicited cancels reported by the exchange.
    pub const EXCHANGE_CANCELLED: &'static str = "EXCHANGE_CANCELLED";

    /// Create a new cancel reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// User requested cancellation.
    #[must_use]
    pub fn user_requested() -> Self {
        Self::new(Self::USER_REQUESTED, "Cancelled by user request")
    }

    /// OCO sibling filled or fired.
    #[must_use]
    pub fn cascade_cancel_sibling() -> Self {
        Self::new(
            Self::CASCADE_CANCEL_SIBLING,
            "Sibling leg of one-cancels-other pair executed",
        )
    }

    /// Entry position squared off instead of leaving it unprotected.
    #[must_use]
    pub fn cascade_squareoff_entry() -> Self {
        Self::new(
            Self::CASCADE_SQUAREOFF_ENTRY,
            "Entry position squared off",
        )
    }

    /// A leg this one depends on was rejected.
    #[must_use]
    pub fn dependency_rejected() -> Self {
        Self::new(
            Self::CASCADE_DEPENDENCY_REJECTED,
            "Leg this order depends on was rejected",
        )
    }

    /// A leg this one depends on was cancelled.
    #[must_use]
    pub fn dependency_cancelled() -> Self {
        Self::new(
            Self::CASCADE_DEPENDENCY_CANCELLED,
            "Leg this order depends on was cancelled",
        )
    }

    /// Iceberg slicing halted.
    #[must_use]
    pub fn iceberg_halted() -> Self {
        Self::new(Self::ICEBERG_HALTED, "Iceberg slicing halted")
    }

    /// Group expired.
    #[must_use]
    pub fn expired() -> Self {
        Self::new(Self::EXPIRED, "Order group expired")
    }

    /// Exchange cancelled the order on its own.
    #[must_use]
    pub fn exchange_cancelled() -> Self {
        Self::new(Self::EXCHANGE_CANCELLED, "Cancelled by exchange")
    }

    /// Returns true if this reason originates from an automatic cascade.
    #[must_use]
    pub fn is_cascade(&self) -> bool {
        self.code.starts_with("CASCADE_") || self.code == Self::ICEBERG_HALTED
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
