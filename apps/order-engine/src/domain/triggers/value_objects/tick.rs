//! Market tick value object.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{InstrumentId, Price, Timestamp};
use crate::domain::triggers::errors::TriggerEvaluationError;

/// Last traded price for an instrument at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument.
    pub instrument: InstrumentId,
    /// Last traded price.
    pub ltp: Price,
    /// Exchange or feed timestamp.
    pub timestamp: Timestamp,
}

impl Tick {
    /// Create a tick stamped with the current time.
    #[must_use]
    pub fn now(instrument: impl Into<InstrumentId>, ltp: Price) -> Self {
        Self {
            instrument: instrument.into(),
            ltp,
            timestamp: Timestamp::now(),
        }
    }

    /// Check that the tick is usable for trigger evaluation.
    ///
    /// # Errors
    ///
    /// Returns error if the price is not positive or the tick is older than
    /// `max_age` relative to `now`. A `max_age` of zero disables the age check.
    pub fn validate(
        &self,
        now: Timestamp,
        max_age: chrono::Duration,
    ) -> Result<(), TriggerEvaluationError> {
        if !self.ltp.is_positive() {
            return Err(TriggerEvaluationError::NonPositivePrice {
                instrument: self.instrument.clone(),
                ltp: self.ltp.to_string(),
            });
        }

        if max_age > chrono::Duration::zero() {
            let age = now.duration_since(self.timestamp);
            if age > max_age {
                return Err(TriggerEvaluationError::StaleTick {
                    instrument: self.instrument.clone(),
                    age_ms: age.num_milliseconds(),
                    max_age_ms: max_age.num_milliseconds(),
                });
            }
        }

        Ok(())
    }
}
