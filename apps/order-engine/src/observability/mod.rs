//! Observability: structured logging and Prometheus metrics.

mod metrics;
mod tracing;

pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_adapter_retry, record_admission_rejected,
    record_cascade, record_group_closed, record_group_created, record_ignored_event,
    record_leg_transition, record_tick_rejected, record_trigger_fired, set_active_groups,
    set_registered_triggers,
};
pub use self::tracing::{TracingError, build_filter, init_tracing};
