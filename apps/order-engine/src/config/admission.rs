//! Admission rule configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::admission::AdmissionLimits;
use crate::domain::shared::{Exchange, Quantity};

/// Admission rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Exchange codes accepted at intake.
    #[serde(default = "default_allowed_exchanges")]
    pub allowed_exchanges: Vec<String>,
    /// Largest quantity a single group may carry.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: i64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            allowed_exchanges: default_allowed_exchanges(),
            max_quantity: default_max_quantity(),
        }
    }
}

impl AdmissionConfig {
    /// Convert to the domain limits.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown exchange code.
    pub fn to_limits(&self) -> Result<AdmissionLimits, ConfigError> {
        let allowed_exchanges = self
            .allowed_exchanges
            .iter()
            .map(|code| {
                code.parse::<Exchange>()
                    .map_err(|e| ConfigError::ValidationError(format!("admission: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AdmissionLimits {
            allowed_exchanges,
            max_quantity: Quantity::from_i64(self.max_quantity),
        })
    }
}

fn default_allowed_exchanges() -> Vec<String> {
    ["NSE", "BSE", "NFO", "BFO"].iter().map(ToString::to_string).collect()
}

const fn default_max_quantity() -> i64 {
    100_000
}
