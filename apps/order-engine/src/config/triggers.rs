//! Trigger evaluation configuration.

use serde::{Deserialize, Serialize};

/// Trigger evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggersConfig {
    /// Ticks older than this are refused (0 disables the check).
    #[serde(default = "default_max_tick_age")]
    pub max_tick_age_ms: u64,
}

impl Default for TriggersConfig {
    fn default() -> Self {
        Self {
            max_tick_age_ms: default_max_tick_age(),
        }
    }
}

impl TriggersConfig {
    /// Maximum tick age as a chrono duration.
    #[must_use]
    pub fn max_tick_age(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.max_tick_age_ms).unwrap_or(i64::MAX))
    }
}

const fn default_max_tick_age() -> u64 {
    5_000
}
