//! Market Data Sources
//!
//! Implementations of the `MarketDataSource` port.

pub mod mock;

pub use mock::MockMarketData;
