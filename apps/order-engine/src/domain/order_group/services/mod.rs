//! Order Group Domain Services
//!
//! Stateless business logic that doesn't fit in the aggregate.

mod cascade_policy;
mod leg_state_machine;
mod status_derivation;

pub use cascade_policy::{CascadeAction, CascadePolicy};
pub use leg_state_machine::LegStateMachine;
pub use status_derivation::GroupStatusDeriver;
