//! Errors surfaced by the coordinator to intake callers.
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `Validation` | Admission rules or request shape refused the request |
//! | `Conflict` | The request contradicts current state (too late, terminal, ...) |
//! | `NotFound` | Unknown group or role |
//! | `Adapter` | The execution adapter failed after retries |
//! | `Store` | Persistence failed |
//!
//! Bad ticks (`Trigger`) classify as `Validation`; the triggers stay armed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ports::AdapterError;
use crate::domain::admission::ValidationError;
use crate::domain::order_group::{OrderGroupError, StoreError};
use crate::domain::shared::GroupId;
use crate::domain::triggers::TriggerEvaluationError;

/// Coarse error class, stable for API mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request refused before touching state.
    Validation,
    /// Request conflicts with current state.
    Conflict,
    /// Group or leg does not exist.
    NotFound,
    /// Execution adapter failure.
    Adapter,
    /// Persistence failure.
    Store,
}

/// Coordinator error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Admission refused the create request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Aggregate refused the operation.
    #[error(transparent)]
    OrderGroup(#[from] OrderGroupError),

    /// No live or archived group with this id.
    #[error("Order group not found: {group_id}")]
    GroupNotFound {
        /// Group id.
        group_id: GroupId,
    },

    /// Execution adapter call failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Order store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A tick could not be evaluated.
    #[error(transparent)]
    Trigger(#[from] TriggerEvaluationError),
}

impl EngineError {
    /// Error class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::OrderGroup(e) if e.is_validation() => ErrorKind::Validation,
            Self::OrderGroup(
                OrderGroupError::RoleNotFound { .. } | OrderGroupError::LegNotFound { .. },
            ) => ErrorKind::NotFound,
            Self::OrderGroup(_) => ErrorKind::Conflict,
            Self::GroupNotFound { .. } | Self::Store(StoreError::NotFound { .. }) => {
                ErrorKind::NotFound
            }
            Self::Adapter(AdapterError::TooLateToCancel { .. }) => ErrorKind::Conflict,
            Self::Adapter(_) => ErrorKind::Adapter,
            Self::Store(_) => ErrorKind::Store,
            Self::Trigger(_) => ErrorKind::Validation,
        }
    }

    /// Returns true if a cancel lost the race against a fill.
    #[must_use]
    pub const fn is_too_late(&self) -> bool {
        matches!(
            self,
            Self::OrderGroup(OrderGroupError::TooLateToCancel { .. })
                | Self::Adapter(AdapterError::TooLateToCancel { .. })
        )
    }
}
