//! Iceberg slicing configuration.

use serde::{Deserialize, Serialize};

use crate::domain::iceberg::IcebergSlicer;

/// Iceberg slicing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcebergConfig {
    /// Largest number of slices a plan may have.
    #[serde(default = "default_max_slices")]
    pub max_slices: usize,
}

impl Default for IcebergConfig {
    fn default() -> Self {
        Self {
            max_slices: default_max_slices(),
        }
    }
}

impl IcebergConfig {
    /// Slicer honouring this configuration.
    #[must_use]
    pub const fn slicer(&self) -> IcebergSlicer {
        IcebergSlicer::new(self.max_slices)
    }
}

const fn default_max_slices() -> usize {
    500
}
