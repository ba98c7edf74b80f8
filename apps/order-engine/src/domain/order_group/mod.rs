//! Order Group Bounded Context
//!
//! Owns the lifecycle of a conditional order and all of its legs.
//!
//! # Key Concepts
//!
//! - **OrderGroup Aggregate**: Root entity; every leg transition goes through it
//! - **Derived Status**: Group status is recomputed from the legs after each change
//! - **Cascade Policy**: Decides sibling cancels, exit releases and square-offs
//! - **Idempotency**: Execution reports are keyed by exchange order and event id

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod repository;
pub mod services;
pub mod value_objects;

pub use aggregate::{
    CreateGroupCommand, ExecutionOutcome, GroupParams, GttOcoLegSpec, GttTriggerSpec, Leg,
    LegModification, LegTemplate, LegUpdate, OrderGroup, OrderPricing,
    SpreadLegSpec, SquareOffRecord, StopLossSpec,
};
pub use errors::OrderGroupError;
pub use events::{GroupClosed, GroupEvent};
pub use repository::{GroupRecord, OrderStore, StoreError, StoredEvent};
pub use services::{CascadeAction, CascadePolicy, GroupStatusDeriver, LegStateMachine};
pub use value_objects::{
    CancelReason, ExecutionKind, ExecutionReport, GroupKind, GroupStatus, LegRole, LegStatus,
    OrderSide, OrderType, ProductType, RejectReason,
};
