//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driven Ports** (Secondary/Outbound): execution adapter, market data,
//!   event publisher. The order store port lives with the aggregate in
//!   `domain::order_group::repository`.

mod event_publisher_port;
mod execution_adapter_port;
mod market_data_port;

pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
pub use execution_adapter_port::{
    AdapterError, ErrorCategory, ExecutionAdapter, LegOrderRequest, ModifyOrderRequest, OpenOrder,
    SquareOffRequest,
};
pub use market_data_port::{MarketDataError, MarketDataSource};
