//! Settable in-memory price source.
//!
//! Used by tests and by the paper-trading binary; prices change only when
//! the caller sets them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::application::ports::{MarketDataError, MarketDataSource};
use crate::domain::shared::{InstrumentId, Price};
use crate::domain::triggers::Tick;

/// Price source backed by a map of last traded prices.
#[derive(Debug, Default)]
pub struct MockMarketData {
    prices: RwLock<HashMap<InstrumentId, Price>>,
    offline: AtomicBool,
}

impl MockMarketData {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the last traded price for an instrument.
    pub fn set_price(&self, instrument: impl Into<InstrumentId>, price: Price) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instrument.into(), price);
    }

    /// Forget the price for an instrument.
    pub fn remove_price(&self, instrument: &InstrumentId) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(instrument);
    }

    /// Make every call fail with a connection error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), MarketDataError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MarketDataError::ConnectionError {
                message: "mock market data offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn last_traded_price(&self, instrument: &InstrumentId) -> Result<Tick, MarketDataError> {
        self.check_online()?;
        let price = self
            .prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(instrument)
            .copied()
            .ok_or_else(|| MarketDataError::DataUnavailable {
                instrument: instrument.clone(),
            })?;
        Ok(Tick::now(instrument.clone(), price))
    }

    async fn health_check(&self) -> Result<(), MarketDataError> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_price_that_was_set() {
        let feed = MockMarketData::new();
        feed.set_price("INFY", Price::from_i64(1_510));

        let tick = feed
            .last_traded_price(&InstrumentId::new("INFY"))
            .await
            .unwrap();
        assert_eq!(tick.ltp, Price::from_i64(1_510));
        assert_eq!(tick.instrument, InstrumentId::new("INFY"));
    }

    #[tokio::test]
    async fn unknown_instrument_is_unavailable() {
        let feed = MockMarketData::new();
        feed.set_price("INFY", Price::from_i64(1_510));
        feed.remove_price(&InstrumentId::new("INFY"));

        let err = feed
            .last_traded_price(&InstrumentId::new("INFY"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn offline_source_fails_health_check() {
        let feed = MockMarketData::new();
        feed.set_offline(true);
        assert!(feed.health_check().await.is_err());
    }
}
