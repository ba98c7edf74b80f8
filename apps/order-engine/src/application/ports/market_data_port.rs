//! Market Data Port (Driven Port)
//!
//! Polled source of last traded prices for instruments with armed triggers.

use async_trait::async_trait;

use crate::domain::shared::InstrumentId;
use crate::domain::triggers::Tick;

/// Market data error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketDataError {
    /// Connection error.
    #[error("Market data connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// No price for the instrument.
    #[error("No market data for {instrument}")]
    DataUnavailable {
        /// Instrument requested.
        instrument: InstrumentId,
    },

    /// Rate limited.
    #[error("Rate limited by market data source")]
    RateLimited,
}

/// Port for reading last traded prices.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest tick for `instrument`.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` if the source has no price for the instrument.
    async fn last_traded_price(&self, instrument: &InstrumentId) -> Result<Tick, MarketDataError>;

    /// Check that the source is reachable.
    ///
    /// # Errors
    ///
    /// Returns error if the source is unavailable.
    async fn health_check(&self) -> Result<(), MarketDataError>;
}
