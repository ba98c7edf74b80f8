//! Iceberg plan: slice sequence and release bookkeeping.

use serde::{Deserialize, Serialize};

use crate::domain::iceberg::errors::IcebergError;
use crate::domain::shared::{GroupId, LegId, Quantity};

/// One planned slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSlice {
    /// Leg that carries this slice.
    pub leg_id: LegId,
    /// 1-based slice number.
    pub number: u32,
    /// Slice quantity.
    pub quantity: Quantity,
}

/// What the coordinator should do after a slice event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceDecision {
    /// Submit this slice next.
    Submit {
        /// Slice leg.
        leg_id: LegId,
        /// Quantity to release.
        quantity: Quantity,
    },
    /// Every slice has been released and filled.
    Complete,
    /// Slicing stopped; these never-released slices must be closed locally.
    Halt {
        /// Unreleased slice legs.
        unreleased: Vec<LegId>,
    },
}

/// Sequential release plan for an iceberg group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebergPlan {
    parent_group_id: GroupId,
    total_quantity: Quantity,
    disclose_quantity: Quantity,
    /// Quantity not yet released to the exchange.
    remaining_quantity: Quantity,
    slices: Vec<PlannedSlice>,
    /// Index of the open slice, or of the next slice before the first release.
    current_slice_index: usize,
    released: usize,
    halted: bool,
}

impl IcebergPlan {
    /// Create a plan from pre-sized slices.
    #[must_use]
    pub const fn new(
        parent_group_id: GroupId,
        total_quantity: Quantity,
        disclose_quantity: Quantity,
        slices: Vec<PlannedSlice>,
    ) -> Self {
        Self {
            parent_group_id,
            total_quantity,
            disclose_quantity,
            remaining_quantity: total_quantity,
            slices,
            current_slice_index: 0,
            released: 0,
            halted: false,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Parent group.
    #[must_use]
    pub const fn parent_group_id(&self) -> &GroupId {
        &self.parent_group_id
    }

    /// Total parent quantity.
    #[must_use]
    pub const fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Disclosed quantity per slice.
    #[must_use]
    pub const fn disclose_quantity(&self) -> Quantity {
        self.disclose_quantity
    }

    /// Quantity not yet released.
    #[must_use]
    pub const fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    /// Planned slices in release order.
    #[must_use]
    pub fn slices(&self) -> &[PlannedSlice] {
        &self.slices
    }

    /// Index of the open (or next) slice.
    #[must_use]
    pub const fn current_slice_index(&self) -> usize {
        self.current_slice_index
    }

    /// Number of slices released so far.
    #[must_use]
    pub const fn released_count(&self) -> usize {
        self.released
    }

    /// Returns true once slicing has stopped early.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Sum of released slice quantities.
    #[must_use]
    pub fn released_quantity(&self) -> Quantity {
        self.slices[..self.released].iter().map(|s| s.quantity).sum()
    }

    /// The slice currently live at the exchange.
    #[must_use]
    pub fn open_slice(&self) -> Option<&PlannedSlice> {
        if self.halted || self.released == 0 || self.released != self.current_slice_index + 1 {
            return None;
        }
        self.slices.get(self.current_slice_index)
    }

    /// Returns true if the leg is one of this plan's slices.
    #[must_use]
    pub fn contains(&self, leg_id: &LegId) -> bool {
        self.slices.iter().any(|s| &s.leg_id == leg_id)
    }

    // ========================================================================
    // Sequencing
    // ========================================================================

    /// Release the first slice.
    ///
    /// # Errors
    ///
    /// Returns error if slicing already started or halted.
    pub fn start(&mut self) -> Result<SliceDecision, IcebergError> {
        if self.halted {
            return Err(IcebergError::Halted);
        }
        if self.released > 0 {
            return Err(IcebergError::AlreadyStarted);
        }
        Ok(self.release(0))
    }

    /// The open slice filled completely; release the next one.
    ///
    /// # Errors
    ///
    /// Returns error if the leg is not the open slice or slicing halted.
    pub fn on_slice_filled(&mut self, leg_id: &LegId) -> Result<SliceDecision, IcebergError> {
        self.ensure_open_slice(leg_id)?;

        if !self.remaining_quantity.is_positive() {
            // Park the index past the end so no slice reads as open.
            self.current_slice_index = self.slices.len();
            return Ok(SliceDecision::Complete);
        }
        Ok(self.release(self.current_slice_index + 1))
    }

    /// The open slice was cancelled or rejected; stop slicing.
    ///
    /// # Errors
    ///
    /// Returns error if the leg is not the open slice or slicing halted.
    pub fn on_slice_terminated(&mut self, leg_id: &LegId) -> Result<SliceDecision, IcebergError> {
        self.ensure_open_slice(leg_id)?;
        Ok(self.halt())
    }

    /// Stop slicing and return every slice that was never released.
    ///
    /// Calling this twice returns an empty list the second time.
    pub fn halt(&mut self) -> SliceDecision {
        let unreleased = if self.halted {
            Vec::new()
        } else {
            self.slices[self.released..]
                .iter()
                .map(|s| s.leg_id.clone())
                .collect()
        };
        self.halted = true;
        SliceDecision::Halt { unreleased }
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn release(&mut self, index: usize) -> SliceDecision {
        let Some(slice) = self.slices.get(index) else {
            self.current_slice_index = self.slices.len();
            return SliceDecision::Complete;
        };
        let quantity = self.disclose_quantity.min(self.remaining_quantity);
        debug_assert_eq!(quantity, slice.quantity);

        self.remaining_quantity = self.remaining_quantity.saturating_sub(quantity);
        self.current_slice_index = index;
        self.released = index + 1;

        SliceDecision::Submit {
            leg_id: slice.leg_id.clone(),
            quantity,
        }
    }

    fn ensure_open_slice(&self, leg_id: &LegId) -> Result<(), IcebergError> {
        if self.halted {
            return Err(IcebergError::Halted);
        }
        if !self.contains(leg_id) {
            return Err(IcebergError::UnknownSlice {
                leg_id: leg_id.clone(),
            });
        }
        let current = self.open_slice().map(|s| s.leg_id.clone());
        if current.as_ref() != Some(leg_id) {
            return Err(IcebergError::NotCurrentSlice {
                leg_id: leg_id.clone(),
                current,
            });
        }
        Ok(())
    }
}
