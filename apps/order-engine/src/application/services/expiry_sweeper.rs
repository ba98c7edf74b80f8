//! Expiry Sweeper
//!
//! Periodically closes groups whose expiry has passed and retries fired
//! legs held behind a sibling that would not cancel.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventPublisherPort, ExecutionAdapter};
use crate::application::services::coordinator::LegOrderCoordinator;
use crate::domain::order_group::OrderStore;
use crate::domain::shared::Timestamp;

/// Background task expiring due groups and retrying held submissions.
pub struct ExpirySweeper<A, S, P>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
{
    coordinator: Arc<LegOrderCoordinator<A, S, P>>,
    sweep_interval: Duration,
    shutdown: CancellationToken,
}

impl<A, S, P> ExpirySweeper<A, S, P>
where
    A: ExecutionAdapter + 'static,
    S: OrderStore + 'static,
    P: EventPublisherPort + 'static,
{
    /// Create a sweeper running every `sweep_interval`.
    pub const fn new(
        coordinator: Arc<LegOrderCoordinator<A, S, P>>,
        sweep_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            sweep_interval,
            shutdown,
        }
    }

    /// Run the sweep loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.coordinator.expire_due(Timestamp::now()).await {
                            Ok(expired) if !expired.is_empty() => {
                                tracing::info!(count = expired.len(), "Expired order groups closed");
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                        }
                        if let Err(e) = self.coordinator.retry_held_submissions().await {
                            tracing::error!(error = %e, "Held submission retry failed");
                        }
                    }
                    () = self.shutdown.cancelled() => {
                        tracing::info!("Expiry sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }
}
