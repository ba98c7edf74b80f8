//! Tick Pump
//!
//! Polls the market data source for every instrument with an armed trigger
//! and feeds the ticks to the coordinator. Instruments with nothing armed
//! are never polled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventPublisherPort, ExecutionAdapter, MarketDataSource};
use crate::application::services::coordinator::LegOrderCoordinator;
use crate::domain::order_group::OrderStore;

/// Background poller driving trigger evaluation.
pub struct TickPump<A, S, P, M>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
    M: MarketDataSource,
{
    coordinator: Arc<LegOrderCoordinator<A, S, P>>,
    market_data: Arc<M>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl<A, S, P, M> TickPump<A, S, P, M>
where
    A: ExecutionAdapter + 'static,
    S: OrderStore + 'static,
    P: EventPublisherPort + 'static,
    M: MarketDataSource + 'static,
{
    /// Create a pump polling every `poll_interval` until `shutdown` fires.
    pub const fn new(
        coordinator: Arc<LegOrderCoordinator<A, S, P>>,
        market_data: Arc<M>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            market_data,
            poll_interval,
            shutdown,
        }
    }

    /// Poll every armed instrument once.
    ///
    /// Returns the number of triggers that fired. Feed and evaluation errors
    /// are logged per instrument and do not stop the pass.
    pub async fn poll_once(&self) -> usize {
        let mut fired = 0;
        for instrument in self.coordinator.evaluator().armed_instruments() {
            let tick = match self.market_data.last_traded_price(&instrument).await {
                Ok(tick) => tick,
                Err(e) => {
                    tracing::debug!(instrument = %instrument, error = %e, "No tick for armed instrument");
                    continue;
                }
            };
            match self.coordinator.on_market_tick(&tick).await {
                Ok(evaluation) => fired += evaluation.fired.len(),
                Err(e) => {
                    tracing::warn!(instrument = %instrument, error = %e, "Tick evaluation failed");
                }
            }
        }
        fired
    }

    /// Run the polling loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::info!(interval_ms = self.poll_interval.as_millis() as u64, "Tick pump started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.poll_once().await;
                    }
                    () = self.shutdown.cancelled() => {
                        tracing::info!("Tick pump shutting down");
                        break;
                    }
                }
            }
        })
    }
}
