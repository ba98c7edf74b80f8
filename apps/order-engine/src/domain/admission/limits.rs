//! Admission limits.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{Exchange, Quantity};

/// Configurable bounds the admission rules check against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionLimits {
    /// Exchanges orders may be routed to.
    pub allowed_exchanges: Vec<Exchange>,
    /// Largest total quantity per group.
    pub max_quantity: Quantity,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            allowed_exchanges: vec![Exchange::Nse, Exchange::Bse, Exchange::Nfo, Exchange::Bfo],
            max_quantity: Quantity::from_i64(100_000),
        }
    }
}
