//! Group status derivation.
//!
//! A group's status is never set directly; it is recomputed from its legs
//! after every transition.

use crate::domain::order_group::aggregate::Leg;
use crate::domain::order_group::value_objects::{GroupKind, GroupStatus, LegRole, LegStatus};
use crate::domain::shared::Quantity;

/// Derives a group's aggregate status from its legs.
pub struct GroupStatusDeriver;

impl GroupStatusDeriver {
    /// Derive the status.
    ///
    /// `squared_off` is true once a square-off order has been issued for the
    /// group's entry position.
    #[must_use]
    pub fn derive(kind: GroupKind, legs: &[Leg], squared_off: bool) -> GroupStatus {
        if legs.iter().any(|l| !l.status().is_terminal()) {
            return if legs.iter().any(|l| l.status() != LegStatus::Created) {
                GroupStatus::Active
            } else {
                GroupStatus::Pending
            };
        }

        let any = |status: LegStatus| legs.iter().any(|l| l.status() == status);
        let filled: Quantity = legs.iter().map(Leg::filled_quantity).sum();

        match kind {
            GroupKind::Bracket | GroupKind::Cover => {
                let exit_filled = legs
                    .iter()
                    .any(|l| l.role().is_exit() && l.status() == LegStatus::Filled);
                let entry_fills = legs
                    .iter()
                    .find(|l| l.role() == LegRole::Entry)
                    .map_or(Quantity::ZERO, Leg::filled_quantity);
                let exit_fills: Quantity = legs
                    .iter()
                    .filter(|l| l.role().is_exit())
                    .map(Leg::filled_quantity)
                    .sum();
                // Exits that each part-filled can still close the whole position.
                if exit_filled || (entry_fills.is_positive() && exit_fills >= entry_fills) {
                    return GroupStatus::Completed;
                }
                let entry_open_position = entry_fills.is_positive();
                if entry_open_position && !squared_off {
                    GroupStatus::Active
                } else if any(LegStatus::Rejected) {
                    GroupStatus::Failed
                } else {
                    GroupStatus::Cancelled
                }
            }
            GroupKind::Gtt | GroupKind::GttOco => {
                if any(LegStatus::Filled) {
                    GroupStatus::Completed
                } else if filled.is_positive() {
                    GroupStatus::PartiallyDone
                } else if any(LegStatus::Rejected) {
                    GroupStatus::Failed
                } else {
                    GroupStatus::Cancelled
                }
            }
            GroupKind::Spread | GroupKind::Iceberg => {
                if legs.iter().all(|l| l.status() == LegStatus::Filled) {
                    GroupStatus::Completed
                } else if filled.is_positive() {
                    GroupStatus::PartiallyDone
                } else if any(LegStatus::Rejected) {
                    GroupStatus::Failed
                } else {
                    GroupStatus::Cancelled
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_group::aggregate::LegTemplate;
    use crate::domain::order_group::value_objects::{CancelReason, OrderSide, OrderType, RejectReason};
    use crate::domain::shared::{ExchangeOrderId, GroupId, InstrumentId, LegId};

    fn leg(role: LegRole) -> Leg {
        Leg::new(
            GroupId::new("grp-1"),
            LegTemplate {
                id: LegId::new(role.to_string()),
                role,
                depends_on: None,
                instrument: InstrumentId::new("SBIN"),
                side: OrderSide::Buy,
                order_type: OrderType::Market,
                quantity: Quantity::from_i64(10),
                price: None,
                trigger_price: None,
                trigger_operator: None,
                trailing_offset: None,
            },
        )
    }

    fn filled(role: LegRole) -> Leg {
        let mut leg = leg(role);
        leg.mark_submitted(ExchangeOrderId::new(format!("EX-{role}")))
            .unwrap();
        leg.fill_remaining(None).unwrap();
        leg
    }

    fn cancelled(role: LegRole) -> Leg {
        let mut leg = leg(role);
        leg.cancel(CancelReason::user_requested()).unwrap();
        leg
    }

    fn rejected(role: LegRole) -> Leg {
        let mut leg = leg(role);
        leg.reject(RejectReason::exchange_rejected("no margin")).unwrap();
        leg
    }

    #[test]
    fn all_created_is_pending() {
        let legs = vec![leg(LegRole::OcoA), leg(LegRole::OcoB)];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::GttOco, &legs, false),
            GroupStatus::Pending
        );
    }

    #[test]
    fn bracket_with_target_filled_is_completed() {
        let legs = vec![
            filled(LegRole::Entry),
            filled(LegRole::Target),
            cancelled(LegRole::StopLoss),
        ];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Bracket, &legs, false),
            GroupStatus::Completed
        );
    }

    #[test]
    fn bracket_with_open_position_stays_active_until_squared_off() {
        let legs = vec![
            filled(LegRole::Entry),
            cancelled(LegRole::Target),
            cancelled(LegRole::StopLoss),
        ];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Bracket, &legs, false),
            GroupStatus::Active
        );
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Bracket, &legs, true),
            GroupStatus::Cancelled
        );
    }

    #[test]
    fn bracket_closed_by_two_partial_exits_is_completed() {
        let part_then_cancel = |role: LegRole, quantity: i64| {
            let mut leg = leg(role);
            leg.mark_submitted(ExchangeOrderId::new(format!("EX-{role}")))
                .unwrap();
            leg.apply_fill(Quantity::from_i64(quantity), None).unwrap();
            leg.cancel(CancelReason::cascade_cancel_sibling()).unwrap();
            leg
        };
        let legs = vec![
            filled(LegRole::Entry),
            part_then_cancel(LegRole::Target, 4),
            part_then_cancel(LegRole::StopLoss, 6),
        ];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Bracket, &legs, false),
            GroupStatus::Completed
        );
    }

    #[test]
    fn bracket_with_rejected_entry_is_failed() {
        let legs = vec![
            rejected(LegRole::Entry),
            cancelled(LegRole::Target),
            cancelled(LegRole::StopLoss),
        ];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Bracket, &legs, false),
            GroupStatus::Failed
        );
    }

    #[test]
    fn iceberg_with_some_fills_is_partially_done() {
        let legs = vec![
            filled(LegRole::Slice(1)),
            cancelled(LegRole::Slice(2)),
            cancelled(LegRole::Slice(3)),
        ];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Iceberg, &legs, false),
            GroupStatus::PartiallyDone
        );
    }

    #[test]
    fn spread_with_rejected_leg_and_no_fill_is_failed() {
        let legs = vec![rejected(LegRole::Near), cancelled(LegRole::Far)];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Spread, &legs, false),
            GroupStatus::Failed
        );
    }

    #[test]
    fn spread_fully_filled_is_completed() {
        let legs = vec![filled(LegRole::Near), filled(LegRole::Far)];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Spread, &legs, false),
            GroupStatus::Completed
        );
    }

    #[test]
    fn one_working_leg_keeps_group_active() {
        let mut working = leg(LegRole::Far);
        working
            .mark_submitted(ExchangeOrderId::new("EX-far"))
            .unwrap();
        let legs = vec![filled(LegRole::Near), working];
        assert_eq!(
            GroupStatusDeriver::derive(GroupKind::Spread, &legs, false),
            GroupStatus::Active
        );
    }
}
