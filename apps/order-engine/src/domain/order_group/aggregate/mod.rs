//! Order Group Aggregate
//!
//! The OrderGroup aggregate is the root entity for a conditional order and
//! owns every leg in it.

mod command;
mod leg;
mod modification;
mod order_group;

pub use command::{
    CreateGroupCommand, GroupParams, GttOcoLegSpec, GttTriggerSpec, OrderPricing, SpreadLegSpec,
    StopLossSpec,
};
pub use leg::{Leg, LegTemplate};
pub use modification::LegModification;
pub use order_group::{ExecutionOutcome, LegUpdate, OrderGroup, SquareOffRecord};
