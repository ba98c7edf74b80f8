//! Trigger conditions and trailing-stop ratcheting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{GroupId, InstrumentId, LegId, Price};

/// Comparison applied between the reference price and the trigger price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerOperator {
    /// Fires when the reference price is at or above the trigger (`>=`).
    AtOrAbove,
    /// Fires when the reference price is at or below the trigger (`<=`).
    AtOrBelow,
}

impl TriggerOperator {
    /// Evaluate `price <op> trigger`.
    #[must_use]
    pub fn holds(&self, price: Price, trigger: Price) -> bool {
        match self {
            Self::AtOrAbove => price >= trigger,
            Self::AtOrBelow => price <= trigger,
        }
    }
}

impl fmt::Display for TriggerOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtOrAbove => write!(f, ">="),
            Self::AtOrBelow => write!(f, "<="),
        }
    }
}

/// Price a condition is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    /// Last traded price.
    #[default]
    LastTradedPrice,
}

/// A registered condition that releases one leg when it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCondition {
    /// Leg released when the condition fires.
    pub leg_id: LegId,
    /// Group owning the leg.
    pub group_id: GroupId,
    /// Instrument whose ticks drive the condition.
    pub instrument: InstrumentId,
    /// Comparison operator.
    pub operator: TriggerOperator,
    /// Reference price source.
    pub reference: PriceSource,
    /// Current trigger price (moves only for trailing conditions).
    pub trigger_price: Price,
    /// Trailing distance; `None` for a fixed trigger.
    pub trailing_offset: Option<Decimal>,
    /// Leg whose trigger is withdrawn when this one fires.
    pub oco_sibling: Option<LegId>,
}

impl TriggerCondition {
    /// Create a fixed trigger.
    #[must_use]
    pub fn fixed(
        leg_id: LegId,
        group_id: GroupId,
        instrument: InstrumentId,
        operator: TriggerOperator,
        trigger_price: Price,
    ) -> Self {
        Self {
            leg_id,
            group_id,
            instrument,
            operator,
            reference: PriceSource::LastTradedPrice,
            trigger_price,
            trailing_offset: None,
            oco_sibling: None,
        }
    }

    /// Make this a trailing trigger with the given offset.
    #[must_use]
    pub fn with_trailing_offset(mut self, offset: Decimal) -> Self {
        self.trailing_offset = Some(offset);
        self
    }

    /// Pair this trigger with an OCO sibling.
    #[must_use]
    pub fn with_oco_sibling(mut self, sibling: LegId) -> Self {
        self.oco_sibling = Some(sibling);
        self
    }

    /// Returns true if the trigger price trails the market.
    #[must_use]
    pub const fn is_trailing(&self) -> bool {
        self.trailing_offset.is_some()
    }

    /// Returns true if `ltp` satisfies the condition.
    #[must_use]
    pub fn is_satisfied_by(&self, ltp: Price) -> bool {
        self.operator.holds(ltp, self.trigger_price)
    }

    /// Move a trailing trigger towards the market, never away from it.
    ///
    /// For `<=` (protecting a long) the trigger follows `ltp - offset` upward.
    /// For `>=` (protecting a short) it follows `ltp + offset` downward.
    /// Returns the new trigger price when it moved.
    pub fn ratchet(&mut self, ltp: Price) -> Option<Price> {
        let offset = self.trailing_offset?;
        let candidate = match self.operator {
            TriggerOperator::AtOrBelow => ltp - offset,
            TriggerOperator::AtOrAbove => ltp + offset,
        };
        let improves = match self.operator {
            TriggerOperator::AtOrBelow => candidate > self.trigger_price,
            TriggerOperator::AtOrAbove => candidate < self.trigger_price,
        };
        if improves && candidate.is_positive() {
            self.trigger_price = candidate;
            Some(candidate)
        } else {
            None
        }
    }
}
