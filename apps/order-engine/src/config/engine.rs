//! Engine runtime configuration: task intervals and channel sizes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Market data polling interval for the tick pump.
    #[serde(default = "default_tick_poll_interval")]
    pub tick_poll_interval_ms: u64,
    /// How often the expiry sweeper looks for expired groups and retries
    /// held submissions.
    #[serde(default = "default_expiry_sweep_interval")]
    pub expiry_sweep_interval_ms: u64,
    /// Capacity of the execution report channel.
    #[serde(default = "default_execution_channel_capacity")]
    pub execution_channel_capacity: usize,
    /// Capacity of the downstream event broadcast channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Reload and reconcile active groups before serving.
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_poll_interval_ms: default_tick_poll_interval(),
            expiry_sweep_interval_ms: default_expiry_sweep_interval(),
            execution_channel_capacity: default_execution_channel_capacity(),
            event_channel_capacity: default_event_channel_capacity(),
            reconcile_on_startup: true,
        }
    }
}

impl EngineConfig {
    /// Tick pump interval.
    #[must_use]
    pub const fn tick_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tick_poll_interval_ms)
    }

    /// Expiry sweep interval.
    #[must_use]
    pub const fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_sweep_interval_ms)
    }
}

const fn default_tick_poll_interval() -> u64 {
    500
}

const fn default_expiry_sweep_interval() -> u64 {
    1_000
}

const fn default_execution_channel_capacity() -> usize {
    1_024
}

const fn default_event_channel_capacity() -> usize {
    1_024
}

pub(crate) const fn default_true() -> bool {
    true
}
