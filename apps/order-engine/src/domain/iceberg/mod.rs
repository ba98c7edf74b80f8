//! Iceberg Bounded Context
//!
//! Splits a large parent order into disclosed slices and decides which
//! slice to release next. The plan only records decisions; the coordinator
//! submits and cancels the slice legs.

pub mod errors;
pub mod plan;
pub mod slicer;

pub use errors::IcebergError;
pub use plan::{IcebergPlan, PlannedSlice, SliceDecision};
pub use slicer::IcebergSlicer;
