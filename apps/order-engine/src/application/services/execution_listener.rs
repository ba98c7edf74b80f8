//! Execution Listener
//!
//! Drains the adapter's execution report stream into the coordinator, one
//! report at a time in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventPublisherPort, ExecutionAdapter};
use crate::application::services::coordinator::LegOrderCoordinator;
use crate::domain::order_group::{ExecutionReport, OrderStore};

/// Background consumer of execution reports.
pub struct ExecutionListener<A, S, P>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
{
    coordinator: Arc<LegOrderCoordinator<A, S, P>>,
    reports: mpsc::Receiver<ExecutionReport>,
    shutdown: CancellationToken,
}

impl<A, S, P> ExecutionListener<A, S, P>
where
    A: ExecutionAdapter + 'static,
    S: OrderStore + 'static,
    P: EventPublisherPort + 'static,
{
    /// Create a listener for `reports`.
    pub const fn new(
        coordinator: Arc<LegOrderCoordinator<A, S, P>>,
        reports: mpsc::Receiver<ExecutionReport>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            reports,
            shutdown,
        }
    }

    /// Consume reports until the stream closes or shutdown fires.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Execution listener started");
            loop {
                tokio::select! {
                    report = self.reports.recv() => {
                        let Some(report) = report else {
                            tracing::warn!("Execution report stream closed");
                            break;
                        };
                        let exchange_order_id = report.exchange_order_id.clone();
                        if let Err(e) = self.coordinator.on_execution_report(report).await {
                            tracing::error!(
                                exchange_order_id = %exchange_order_id,
                                error = %e,
                                "Execution report not applied"
                            );
                        }
                    }
                    () = self.shutdown.cancelled() => {
                        tracing::info!("Execution listener shutting down");
                        break;
                    }
                }
            }
        })
    }
}
