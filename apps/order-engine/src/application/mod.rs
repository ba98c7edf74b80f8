//! Application Layer
//!
//! Orchestrates the domain through the coordinator and its background
//! services. It defines:
//!
//! - **Ports**: Interfaces to the exchange adapter, market data and event
//!   consumers
//! - **Services**: The leg order coordinator, trigger evaluator and the
//!   loops that feed them
//! - **DTOs**: Read models returned to callers

pub mod dto;
pub mod errors;
pub mod ports;
pub mod services;

pub use dto::*;
pub use errors::EngineError;
pub use ports::*;
pub use services::*;
