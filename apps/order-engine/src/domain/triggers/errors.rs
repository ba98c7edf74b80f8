//! Trigger evaluation errors.

use std::fmt;

use crate::domain::shared::{InstrumentId, LegId};

/// Errors raised while registering or evaluating trigger conditions.
///
/// Evaluation errors never discard a trigger; it stays armed and is
/// evaluated again on the next good tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvaluationError {
    /// Tick carried a zero or negative last traded price.
    NonPositivePrice {
        /// Instrument of the bad tick.
        instrument: InstrumentId,
        /// Reported price.
        ltp: String,
    },

    /// Tick is older than the configured maximum age.
    StaleTick {
        /// Instrument of the stale tick.
        instrument: InstrumentId,
        /// Age of the tick in milliseconds.
        age_ms: i64,
        /// Allowed age in milliseconds.
        max_age_ms: i64,
    },

    /// No price was available for an instrument with armed triggers.
    MissingMarketData {
        /// Instrument without data.
        instrument: InstrumentId,
        /// Source error description.
        message: String,
    },

    /// A trigger for this leg is already registered.
    AlreadyRegistered {
        /// Leg id.
        leg_id: LegId,
    },

    /// Condition cannot be evaluated (e.g., non-positive trailing offset).
    InvalidCondition {
        /// Leg id.
        leg_id: LegId,
        /// Description.
        message: String,
    },
}

impl fmt::Display for TriggerEvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositivePrice { instrument, ltp } => {
                write!(f, "Non-positive LTP {ltp} for {instrument}")
            }
            Self::StaleTick {
                instrument,
                age_ms,
                max_age_ms,
            } => {
                write!(
                    f,
                    "Stale tick for {instrument}: {age_ms}ms old (max {max_age_ms}ms)"
                )
            }
            Self::MissingMarketData {
                instrument,
                message,
            } => {
                write!(f, "No market data for {instrument}: {message}")
            }
            Self::AlreadyRegistered { leg_id } => {
                write!(f, "Trigger already registered for leg {leg_id}")
            }
            Self::InvalidCondition { leg_id, message } => {
                write!(f, "Invalid trigger condition for leg {leg_id}: {message}")
            }
        }
    }
}

impl std::error::Error for TriggerEvaluationError {}
