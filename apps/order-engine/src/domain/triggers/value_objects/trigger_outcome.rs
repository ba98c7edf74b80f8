//! Results of evaluating a tick against a trigger book.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{GroupId, InstrumentId, LegId, Price, Timestamp};

/// A trigger condition held and was deregistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFired {
    /// Leg to release.
    pub leg_id: LegId,
    /// Group owning the leg.
    pub group_id: GroupId,
    /// Instrument the tick was for.
    pub instrument: InstrumentId,
    /// Trigger price at the moment of firing.
    pub trigger_price: Price,
    /// Price that satisfied the condition.
    pub ltp: Price,
    /// OCO sibling whose trigger was withdrawn in the same step.
    pub withdrawn_sibling: Option<LegId>,
    /// Tick timestamp.
    pub fired_at: Timestamp,
}

/// A trailing trigger price moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAdjusted {
    /// Leg whose trigger moved.
    pub leg_id: LegId,
    /// Group owning the leg.
    pub group_id: GroupId,
    /// Trigger price before the tick.
    pub previous: Price,
    /// Trigger price after the tick.
    pub current: Price,
}

/// Everything one tick did to a book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvaluation {
    /// Triggers that fired (already deregistered).
    pub fired: Vec<TriggerFired>,
    /// Trailing triggers that moved without firing.
    pub adjusted: Vec<TriggerAdjusted>,
}

impl TickEvaluation {
    /// Returns true if the tick changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty() && self.adjusted.is_empty()
    }

    /// Merge another evaluation into this one.
    pub fn extend(&mut self, other: Self) {
        self.fired.extend(other.fired);
        self.adjusted.extend(other.adjusted);
    }
}
