//! Trigger Book
//!
//! Holds every armed trigger for a single instrument and evaluates ticks
//! against them. A fired trigger is removed in the same step that reports
//! it, together with its OCO sibling, so a condition can fire at most once.

use std::collections::BTreeMap;

use crate::domain::shared::{GroupId, InstrumentId, LegId};
use crate::domain::triggers::errors::TriggerEvaluationError;
use crate::domain::triggers::value_objects::{
    Tick, TickEvaluation, TriggerAdjusted, TriggerCondition, TriggerFired,
};

/// Armed triggers for one instrument.
#[derive(Debug, Clone)]
pub struct TriggerBook {
    instrument: InstrumentId,
    // BTreeMap keeps evaluation order deterministic across runs.
    triggers: BTreeMap<LegId, TriggerCondition>,
}

impl TriggerBook {
    /// Create an empty book for an instrument.
    #[must_use]
    pub const fn new(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            triggers: BTreeMap::new(),
        }
    }

    /// Instrument this book serves.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Number of armed triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Returns true if no trigger is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Look up the armed condition for a leg.
    #[must_use]
    pub fn get(&self, leg_id: &LegId) -> Option<&TriggerCondition> {
        self.triggers.get(leg_id)
    }

    /// Arm a trigger.
    ///
    /// # Errors
    ///
    /// Returns error if the leg already has a trigger, the condition is for a
    /// different instrument, or a trailing offset is not positive.
    pub fn register(&mut self, condition: TriggerCondition) -> Result<(), TriggerEvaluationError> {
        if condition.instrument != self.instrument {
            return Err(TriggerEvaluationError::InvalidCondition {
                leg_id: condition.leg_id,
                message: format!(
                    "condition for {} registered on book for {}",
                    condition.instrument, self.instrument
                ),
            });
        }
        if let Some(offset) = condition.trailing_offset {
            if offset <= rust_decimal::Decimal::ZERO {
                return Err(TriggerEvaluationError::InvalidCondition {
                    leg_id: condition.leg_id,
                    message: "trailing offset must be positive".to_string(),
                });
            }
        }
        if self.triggers.contains_key(&condition.leg_id) {
            return Err(TriggerEvaluationError::AlreadyRegistered {
                leg_id: condition.leg_id,
            });
        }
        self.triggers.insert(condition.leg_id.clone(), condition);
        Ok(())
    }

    /// Disarm a trigger, returning it if it was armed.
    pub fn deregister(&mut self, leg_id: &LegId) -> Option<TriggerCondition> {
        self.triggers.remove(leg_id)
    }

    /// Disarm every trigger belonging to a group.
    pub fn deregister_group(&mut self, group_id: &GroupId) -> Vec<LegId> {
        let legs: Vec<LegId> = self
            .triggers
            .values()
            .filter(|c| &c.group_id == group_id)
            .map(|c| c.leg_id.clone())
            .collect();
        for leg in &legs {
            self.triggers.remove(leg);
        }
        legs
    }

    /// Evaluate a tick.
    ///
    /// Trailing triggers ratchet first, then every condition is tested
    /// against the tick's LTP. Fired conditions and their OCO siblings are
    /// removed before this returns.
    pub fn evaluate(&mut self, tick: &Tick) -> TickEvaluation {
        let mut outcome = TickEvaluation::default();
        if tick.instrument != self.instrument {
            return outcome;
        }

        let leg_ids: Vec<LegId> = self.triggers.keys().cloned().collect();
        for leg_id in leg_ids {
            // May already be gone as the sibling of an earlier fire.
            let Some(condition) = self.triggers.get_mut(&leg_id) else {
                continue;
            };

            let previous = condition.trigger_price;
            let adjusted = condition.ratchet(tick.ltp);

            if !condition.is_satisfied_by(tick.ltp) {
                if let Some(current) = adjusted {
                    outcome.adjusted.push(TriggerAdjusted {
                        leg_id: condition.leg_id.clone(),
                        group_id: condition.group_id.clone(),
                        previous,
                        current,
                    });
                }
                continue;
            }

            let Some(fired) = self.triggers.remove(&leg_id) else {
                continue;
            };
            let withdrawn_sibling = fired
                .oco_sibling
                .as_ref()
                .and_then(|sibling| self.triggers.remove(sibling))
                .map(|c| c.leg_id);

            outcome.fired.push(TriggerFired {
                leg_id: fired.leg_id,
                group_id: fired.group_id,
                instrument: fired.instrument,
                trigger_price: fired.trigger_price,
                ltp: tick.ltp,
                withdrawn_sibling,
                fired_at: tick.timestamp,
            });
        }

        outcome
    }
}
