//! Order Engine Binary
//!
//! Runs the conditional order core against the paper execution adapter and
//! the settable market data source.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ENGINE_CONFIG`: Path to the YAML config (default: `config.yaml`
//!   when present, built-in defaults otherwise)
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_engine::application::ports::{ExecutionAdapter, MarketDataSource};
use order_engine::application::services::{
    ExecutionListener, ExpirySweeper, LegOrderCoordinator, TickPump, TriggerEvaluator,
};
use order_engine::config::{Config, load_config};
use order_engine::domain::order_group::OrderStore;
use order_engine::infrastructure::execution::PaperExecutionAdapter;
use order_engine::infrastructure::market_data::MockMarketData;
use order_engine::infrastructure::persistence::InMemoryOrderStore;
use order_engine::infrastructure::publisher::BroadcastEventPublisher;
use order_engine::observability::{MetricsConfig, init_metrics, init_tracing};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinator wired to the paper adapter.
type PaperCoordinator =
    LegOrderCoordinator<PaperExecutionAdapter, InMemoryOrderStore, BroadcastEventPublisher>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = load_config(None).context("failed to load configuration")?;
    init_tracing(&config.observability.logging).context("failed to initialize tracing")?;
    start_metrics(&config)?;

    tracing::info!("Starting order engine");

    let (adapter, reports) =
        PaperExecutionAdapter::with_report_channel(config.engine.execution_channel_capacity);
    let adapter = Arc::new(adapter);
    let market_data = Arc::new(MockMarketData::new());
    let store = Arc::new(InMemoryOrderStore::new());
    let coordinator = Arc::new(create_coordinator(
        &config,
        Arc::clone(&adapter),
        Arc::clone(&store),
    )?);

    store
        .health_check()
        .await
        .context("order store health check failed")?;
    adapter
        .health_check()
        .await
        .context("execution adapter health check failed")?;
    market_data
        .health_check()
        .await
        .context("market data health check failed")?;

    if config.engine.reconcile_on_startup {
        let report = coordinator
            .recover()
            .await
            .context("startup recovery failed")?;
        tracing::info!(
            groups = report.recovered_groups,
            armed = report.armed_triggers,
            resubmitted = report.resubmitted,
            missing = report.missing_at_exchange.len(),
            "Startup recovery complete"
        );
    }

    let shutdown = CancellationToken::new();
    let handles = vec![
        ExecutionListener::new(Arc::clone(&coordinator), reports, shutdown.clone()).spawn(),
        TickPump::new(
            Arc::clone(&coordinator),
            Arc::clone(&market_data),
            config.engine.tick_poll_interval(),
            shutdown.clone(),
        )
        .spawn(),
        ExpirySweeper::new(
            Arc::clone(&coordinator),
            config.engine.expiry_sweep_interval(),
            shutdown.clone(),
        )
        .spawn(),
    ];

    tracing::info!("Order engine ready");

    shutdown_signal().await;
    await_shutdown(handles, shutdown).await;

    tracing::info!(
        active_groups = coordinator.active_groups(),
        "Order engine stopped"
    );
    Ok(())
}

/// Build the coordinator and its collaborators from configuration.
fn create_coordinator(
    config: &Config,
    adapter: Arc<PaperExecutionAdapter>,
    store: Arc<InMemoryOrderStore>,
) -> anyhow::Result<PaperCoordinator> {
    let limits = config
        .admission
        .to_limits()
        .context("invalid admission limits")?;
    let publisher = Arc::new(BroadcastEventPublisher::new(
        config.engine.event_channel_capacity,
    ));
    let evaluator = Arc::new(TriggerEvaluator::new(config.triggers.max_tick_age()));

    Ok(LegOrderCoordinator::new(adapter, store, publisher, evaluator)
        .with_admission_limits(limits)
        .with_slicer(config.iceberg.slicer())
        .with_retry_policy(config.retry.to_policy()))
}

/// Start the Prometheus exporter when enabled.
fn start_metrics(config: &Config) -> anyhow::Result<()> {
    let settings = &config.observability.metrics;
    if !settings.enabled {
        return Ok(());
    }
    let addr: SocketAddr = settings
        .listen_addr
        .parse()
        .with_context(|| format!("invalid metrics address '{}'", settings.listen_addr))?;
    init_metrics(&MetricsConfig::with_addr(addr))?;
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGTERM or Ctrl+C.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Stop background services and wait for them, bounded by
/// `SHUTDOWN_TIMEOUT`.
async fn await_shutdown(handles: Vec<JoinHandle<()>>, shutdown: CancellationToken) {
    shutdown.cancel();
    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );

    let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, futures::future::join_all(handles)).await;
    match joined {
        Ok(results) => {
            for result in results {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Background service panicked");
                }
            }
        }
        Err(_) => tracing::warn!("Background services did not stop before the timeout"),
    }
}
