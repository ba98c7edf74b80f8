//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the domain and application
//! layers:
//!
//! - `persistence/`: Order store (in-memory)
//! - `execution/`: Paper execution adapter with a scriptable event stream
//! - `market_data/`: Settable last-traded-price source
//! - `publisher/`: Broadcast event publisher for downstream consumers

pub mod execution;
pub mod market_data;
pub mod persistence;
pub mod publisher;
