//! Domain Layer
//!
//! Pure business logic for conditional orders. Nothing in here performs I/O;
//! the application layer drives these types through ports.
//!
//! # Bounded Contexts
//!
//! - `order_group`: OrderGroup aggregate, leg lifecycle, cascade policy
//! - `triggers`: GTT/OCO/trailing trigger conditions and the instrument-indexed book
//! - `iceberg`: Disclosed-quantity slicing plans
//! - `admission`: Pre-admission rule table
//! - `shared`: Identifiers, prices, quantities, timestamps

pub mod admission;
pub mod iceberg;
pub mod order_group;
pub mod shared;
pub mod triggers;
