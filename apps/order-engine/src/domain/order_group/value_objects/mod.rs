//! Value objects for the order group context.

mod execution_report;
mod group_kind;
mod group_status;
mod leg_role;
mod leg_status;
mod order_side;
mod order_type;
mod product;
mod reasons;

pub use execution_report::{ExecutionKind, ExecutionReport};
pub use group_kind::GroupKind;
pub use group_status::GroupStatus;
pub use leg_role::LegRole;
pub use leg_status::LegStatus;
pub use order_side::OrderSide;
pub use order_type::OrderType;
pub use product::ProductType;
pub use reasons::{CancelReason, RejectReason};
