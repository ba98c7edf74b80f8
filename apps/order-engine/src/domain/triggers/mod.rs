//! Triggers Bounded Context
//!
//! Price conditions that hold a leg back until the market reaches a level:
//! GTT single triggers, GTT one-cancels-other pairs and trailing stop-losses.
//!
//! The book here is synchronous and owns no locks; the application layer
//! wraps one book per instrument so ticks for an instrument apply in order.

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::TriggerEvaluationError;
pub use services::TriggerBook;
pub use value_objects::{
    PriceSource, Tick, TickEvaluation, TriggerAdjusted, TriggerCondition, TriggerFired,
    TriggerOperator,
};
