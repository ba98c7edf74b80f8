//! Iceberg planning errors.

use std::fmt;

use crate::domain::shared::LegId;

/// Errors raised by iceberg planning and slice sequencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcebergError {
    /// Total or disclosed quantity is not usable.
    InvalidQuantity {
        /// Description.
        message: String,
    },

    /// The plan would exceed the configured slice limit.
    TooManySlices {
        /// Slices required.
        required: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Slice does not belong to the plan.
    UnknownSlice {
        /// Leg id.
        leg_id: LegId,
    },

    /// Event for a slice that is not the currently open one.
    NotCurrentSlice {
        /// Leg id received.
        leg_id: LegId,
        /// Currently open slice, if any.
        current: Option<LegId>,
    },

    /// Slicing has already halted.
    Halted,

    /// The first slice has already been released.
    AlreadyStarted,
}

impl fmt::Display for IcebergError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuantity { message } => write!(f, "Invalid iceberg quantity: {message}"),
            Self::TooManySlices { required, max } => {
                write!(f, "Iceberg needs {required} slices, maximum is {max}")
            }
            Self::UnknownSlice { leg_id } => write!(f, "Unknown iceberg slice: {leg_id}"),
            Self::NotCurrentSlice { leg_id, current } => match current {
                Some(current) => write!(f, "Slice {leg_id} is not the open slice ({current})"),
                None => write!(f, "Slice {leg_id} is not open; no slice is open"),
            },
            Self::Halted => write!(f, "Iceberg slicing has halted"),
            Self::AlreadyStarted => write!(f, "Iceberg slicing has already started"),
        }
    }
}

impl std::error::Error for IcebergError {}
