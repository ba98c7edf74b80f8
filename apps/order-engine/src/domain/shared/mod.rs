//! Shared kernel: value objects and errors used by every bounded context.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    ClientId, EventId, Exchange, ExchangeOrderId, GroupId, InstrumentId, LegId, Price, Quantity,
    Timestamp,
};
