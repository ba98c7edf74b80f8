//! Prometheus metrics for the order engine.
//!
//! Counters and gauges go through the `metrics` facade; without an installed
//! recorder they are no-ops, so tests never need to set one up.
//!
//! # Example
//!
//! ```ignore
//! use order_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_trigger_fired("GTT");
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::domain::order_group::{GroupKind, GroupStatus, LegRole, LegStatus};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Exporter listening on `addr`.
    #[must_use]
    pub const fn with_addr(addr: SocketAddr) -> Self {
        Self { listen_addr: addr }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Install the Prometheus exporter, serving `/metrics` on the configured address.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter started");
    Ok(())
}

// ============================================================================
// Group Lifecycle
// ============================================================================

/// A group passed admission and was created.
pub fn record_group_created(kind: GroupKind) {
    counter!("order_engine_groups_created_total", "kind" => kind.code()).increment(1);
}

/// A group reached a terminal status.
pub fn record_group_closed(kind: GroupKind, status: GroupStatus) {
    counter!(
        "order_engine_groups_closed_total",
        "kind" => kind.code(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// A create request was refused at admission.
pub fn record_admission_rejected(code: &str) {
    counter!("order_engine_admission_rejected_total", "code" => code.to_string()).increment(1);
}

/// A leg changed status.
pub fn record_leg_transition(role: LegRole, status: LegStatus) {
    let role = match role {
        LegRole::Slice(_) => "SLICE".to_string(),
        other => other.to_string(),
    };
    counter!(
        "order_engine_leg_transitions_total",
        "role" => role,
        "status" => status.to_string()
    )
    .increment(1);
}

/// An automatic cascade closed a leg or issued a square-off.
pub fn record_cascade(reason_code: &str) {
    counter!("order_engine_cascades_total", "reason" => reason_code.to_string()).increment(1);
}

/// Live groups held in memory.
pub fn set_active_groups(count: usize) {
    gauge!("order_engine_active_groups").set(count as f64);
}

// ============================================================================
// Triggers
// ============================================================================

/// A trigger condition fired.
pub fn record_trigger_fired(kind: GroupKind) {
    counter!("order_engine_triggers_fired_total", "kind" => kind.code()).increment(1);
}

/// A tick was refused (stale or non-positive).
pub fn record_tick_rejected(reason: &'static str) {
    counter!("order_engine_ticks_rejected_total", "reason" => reason).increment(1);
}

/// Armed trigger conditions.
pub fn set_registered_triggers(count: usize) {
    gauge!("order_engine_registered_triggers").set(count as f64);
}

// ============================================================================
// Adapter and Events
// ============================================================================

/// An adapter call is being retried.
pub fn record_adapter_retry(operation: &'static str) {
    counter!("order_engine_adapter_retries_total", "operation" => operation).increment(1);
}

/// An event was dropped without changing state.
pub fn record_ignored_event(reason: &'static str) {
    counter!("order_engine_ignored_events_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_exporter_is_a_no_op() {
        record_group_created(GroupKind::Bracket);
        record_leg_transition(LegRole::Slice(3), LegStatus::Filled);
        record_cascade("CASCADE_CANCEL_SIBLING");
        record_adapter_retry("submit_leg");
        set_registered_triggers(4);
    }

    #[test]
    fn metrics_config_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9191".parse().unwrap();
        assert_eq!(MetricsConfig::with_addr(addr).listen_addr, addr);
    }
}
