//! Trigger value objects.

mod tick;
mod trigger_condition;
mod trigger_outcome;

pub use tick::Tick;
pub use trigger_condition::{PriceSource, TriggerCondition, TriggerOperator};
pub use trigger_outcome::{TickEvaluation, TriggerAdjusted, TriggerFired};
