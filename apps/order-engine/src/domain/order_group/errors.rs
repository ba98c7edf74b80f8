//! Order group errors.

use std::fmt;

use super::value_objects::{GroupStatus, LegRole, LegStatus};
use crate::domain::iceberg::IcebergError;
use crate::domain::shared::{ExchangeOrderId, GroupId, LegId};

/// Errors that can occur while mutating an order group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderGroupError {
    /// Invalid leg state transition attempted.
    InvalidStateTransition {
        /// Leg.
        leg_id: LegId,
        /// Current status.
        from: LegStatus,
        /// Attempted status.
        to: LegStatus,
    },

    /// The group reached a terminal status and is frozen.
    GroupTerminal {
        /// Group.
        group_id: GroupId,
        /// Terminal status.
        status: GroupStatus,
    },

    /// No leg with this id in the group.
    LegNotFound {
        /// Leg id.
        leg_id: LegId,
    },

    /// No leg with this role in the group.
    RoleNotFound {
        /// Role requested.
        role: LegRole,
    },

    /// No leg carries this exchange order id.
    UnknownExchangeOrder {
        /// Exchange order id.
        exchange_order_id: ExchangeOrderId,
    },

    /// A fill would push filled quantity past ordered quantity.
    FillExceedsOrdered {
        /// Leg.
        leg_id: LegId,
        /// Fill quantity attempted.
        fill_qty: String,
        /// Remaining unfilled quantity.
        remaining_qty: String,
    },

    /// Cancel arrived after the leg filled.
    TooLateToCancel {
        /// Leg.
        leg_id: LegId,
    },

    /// Leg is already cancelled or rejected.
    LegAlreadyClosed {
        /// Leg.
        leg_id: LegId,
        /// Its terminal status.
        status: LegStatus,
    },

    /// Only the currently open iceberg slice can be cancelled.
    NotOpenSlice {
        /// Leg.
        leg_id: LegId,
    },

    /// Leg cannot be modified in its current state.
    ModificationNotAllowed {
        /// Leg.
        leg_id: LegId,
        /// Why.
        reason: String,
    },

    /// Invalid group parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Iceberg sequencing error.
    Iceberg(IcebergError),
}

impl OrderGroupError {
    /// Returns true for errors caused by the request conflicting with current state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::InvalidStateTransition { .. }
                | Self::GroupTerminal { .. }
                | Self::TooLateToCancel { .. }
                | Self::LegAlreadyClosed { .. }
                | Self::NotOpenSlice { .. }
                | Self::ModificationNotAllowed { .. }
                | Self::Iceberg(_)
        )
    }

    /// Returns true for errors caused by malformed input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidParameters { .. })
    }
}

impl fmt::Display for OrderGroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { leg_id, from, to } => {
                write!(f, "Invalid leg state transition for {leg_id}: {from} -> {to}")
            }
            Self::GroupTerminal { group_id, status } => {
                write!(f, "Order group {group_id} is {status} and can no longer change")
            }
            Self::LegNotFound { leg_id } => write!(f, "Leg not found: {leg_id}"),
            Self::RoleNotFound { role } => write!(f, "No {role} leg in this group"),
            Self::UnknownExchangeOrder { exchange_order_id } => {
                write!(f, "No leg for exchange order {exchange_order_id}")
            }
            Self::FillExceedsOrdered {
                leg_id,
                fill_qty,
                remaining_qty,
            } => {
                write!(
                    f,
                    "Fill quantity {fill_qty} exceeds remaining {remaining_qty} on leg {leg_id}"
                )
            }
            Self::TooLateToCancel { leg_id } => {
                write!(f, "Too late to cancel: leg {leg_id} already filled")
            }
            Self::LegAlreadyClosed { leg_id, status } => {
                write!(f, "Leg {leg_id} is already {status}")
            }
            Self::NotOpenSlice { leg_id } => {
                write!(f, "Leg {leg_id} is not the open iceberg slice")
            }
            Self::ModificationNotAllowed { leg_id, reason } => {
                write!(f, "Cannot modify leg {leg_id}: {reason}")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order group parameter '{field}': {message}")
            }
            Self::Iceberg(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OrderGroupError {}

impl From<IcebergError> for OrderGroupError {
    fn from(value: IcebergError) -> Self {
        match value {
            IcebergError::InvalidQuantity { message } => Self::InvalidParameters {
                field: "disclose_quantity".to_string(),
                message,
            },
            IcebergError::TooManySlices { required, max } => Self::InvalidParameters {
                field: "disclose_quantity".to_string(),
                message: format!("plan needs {required} slices, maximum is {max}"),
            },
            other => Self::Iceberg(other),
        }
    }
}
