//! Iceberg Slicer Domain Service

use rust_decimal::prelude::ToPrimitive;

use crate::domain::iceberg::errors::IcebergError;
use crate::domain::iceberg::plan::{IcebergPlan, PlannedSlice};
use crate::domain::shared::{GroupId, LegId, Quantity};

/// Builds iceberg plans.
///
/// Each slice is `min(disclose, remaining)`, so every slice but the last is
/// exactly the disclosed size and the slices sum to the total.
#[derive(Debug, Clone, Copy)]
pub struct IcebergSlicer {
    max_slices: usize,
}

impl IcebergSlicer {
    /// Create a slicer that refuses plans longer than `max_slices`.
    #[must_use]
    pub const fn new(max_slices: usize) -> Self {
        Self { max_slices }
    }

    /// Compute slice sizes for a parent order.
    ///
    /// # Errors
    ///
    /// Returns error if either quantity is not positive or the plan would
    /// need more than the configured number of slices.
    pub fn slice_sizes(
        &self,
        total: Quantity,
        disclose: Quantity,
    ) -> Result<Vec<Quantity>, IcebergError> {
        if !total.is_positive() {
            return Err(IcebergError::InvalidQuantity {
                message: format!("total quantity must be positive, got {total}"),
            });
        }
        if !disclose.is_positive() {
            return Err(IcebergError::InvalidQuantity {
                message: format!("disclosed quantity must be positive, got {disclose}"),
            });
        }

        let full = (total.amount() / disclose.amount()).floor();
        let has_tail = !(total.amount() % disclose.amount()).is_zero();
        let required = full
            .to_usize()
            .unwrap_or(usize::MAX)
            .saturating_add(usize::from(has_tail));
        if required > self.max_slices {
            return Err(IcebergError::TooManySlices {
                required,
                max: self.max_slices,
            });
        }

        let mut sizes = Vec::with_capacity(required);
        let mut remaining = total;
        while remaining.is_positive() {
            let size = disclose.min(remaining);
            sizes.push(size);
            remaining = remaining.saturating_sub(size);
        }
        Ok(sizes)
    }

    /// Create a plan for a parent group, allocating a leg id per slice.
    ///
    /// # Errors
    ///
    /// Returns error under the same conditions as [`Self::slice_sizes`].
    pub fn create_plan(
        &self,
        parent_group_id: GroupId,
        total: Quantity,
        disclose: Quantity,
    ) -> Result<IcebergPlan, IcebergError> {
        let slices = self
            .slice_sizes(total, disclose)?
            .into_iter()
            .enumerate()
            .map(|(i, quantity)| PlannedSlice {
                leg_id: LegId::generate(),
                number: u32::try_from(i + 1).unwrap_or(u32::MAX),
                quantity,
            })
            .collect();
        Ok(IcebergPlan::new(parent_group_id, total, disclose, slices))
    }
}

impl Default for IcebergSlicer {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::from_i64(n)
    }

    #[test]
    fn even_split() {
        let sizes = IcebergSlicer::default().slice_sizes(qty(1000), qty(100)).unwrap();
        assert_eq!(sizes.len(), 10);
        assert!(sizes.iter().all(|s| *s == qty(100)));
    }

    #[test]
    fn tail_slice_is_smaller() {
        let sizes = IcebergSlicer::default().slice_sizes(qty(250), qty(100)).unwrap();
        assert_eq!(sizes, vec![qty(100), qty(100), qty(50)]);
    }

    #[test]
    fn disclose_larger_than_total_is_single_slice() {
        let sizes = IcebergSlicer::default().slice_sizes(qty(40), qty(100)).unwrap();
        assert_eq!(sizes, vec![qty(40)]);
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let slicer = IcebergSlicer::default();
        assert!(slicer.slice_sizes(Quantity::ZERO, qty(10)).is_err());
        assert!(slicer.slice_sizes(qty(10), Quantity::ZERO).is_err());
    }

    #[test]
    fn enforces_slice_limit() {
        let err = IcebergSlicer::new(5).slice_sizes(qty(1000), qty(100)).unwrap_err();
        assert_eq!(
            err,
            IcebergError::TooManySlices {
                required: 10,
                max: 5
            }
        );
    }

    #[test]
    fn plan_numbers_slices_from_one() {
        let plan = IcebergSlicer::default()
            .create_plan(GroupId::new("grp-1"), qty(300), qty(100))
            .unwrap();
        let numbers: Vec<u32> = plan.slices().iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
