//! Cascade Policy Service
//!
//! Decides what has to happen to the rest of a group after one of its legs
//! moves. The policy only reads the group; the coordinator executes the
//! returned actions in order.

use crate::domain::order_group::aggregate::{Leg, LegUpdate, OrderGroup};
use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::order_group::value_objects::{CancelReason, GroupKind, LegRole, LegStatus};
use crate::domain::shared::{LegId, Quantity};

/// A transition request for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeAction {
    /// Send the leg to the execution adapter.
    Submit {
        /// Leg.
        leg_id: LegId,
    },
    /// Register the leg's trigger condition with the evaluator.
    ArmTrigger {
        /// Leg.
        leg_id: LegId,
    },
    /// Cancel the leg (at the adapter if working, locally otherwise).
    Cancel {
        /// Leg.
        leg_id: LegId,
        /// Reason recorded on the leg.
        reason: CancelReason,
    },
    /// Shrink a live exit so it cannot close more than the open position.
    Resize {
        /// Leg.
        leg_id: LegId,
        /// New ordered quantity, fills included.
        quantity: Quantity,
    },
    /// Flatten the open entry position.
    SquareOff {
        /// Reason recorded on the square-off.
        reason: CancelReason,
    },
}

/// Cascade rules for every group kind.
pub struct CascadePolicy;

impl CascadePolicy {
    /// Actions right after a group is created.
    #[must_use]
    pub fn on_created(group: &OrderGroup) -> Vec<CascadeAction> {
        match group.kind() {
            GroupKind::Bracket | GroupKind::Cover => group
                .leg_by_role(LegRole::Entry)
                .map(release)
                .into_iter()
                .collect(),
            GroupKind::Spread | GroupKind::Gtt | GroupKind::GttOco => group
                .legs()
                .iter()
                .filter(|l| l.status() == LegStatus::Created)
                .map(release)
                .collect(),
            GroupKind::Iceberg => next_slice(group).into_iter().collect(),
        }
    }

    /// Actions after a leg update produced by an execution report or a
    /// rejected submission.
    #[must_use]
    pub fn on_leg_update(group: &OrderGroup, update: &LegUpdate) -> Vec<CascadeAction> {
        if group.is_terminal() || !update.changed() {
            return Vec::new();
        }
        let Some(leg) = group.leg(&update.leg_id) else {
            return Vec::new();
        };
        match update.current {
            LegStatus::Filled => Self::on_leg_filled(group, leg),
            LegStatus::Rejected => Self::on_leg_rejected(group, leg),
            LegStatus::Cancelled => Self::on_leg_cancelled(group, leg),
            LegStatus::PartiallyFilled if leg.role().is_exit() => Self::fit_exits(group),
            LegStatus::Created
            | LegStatus::Submitted
            | LegStatus::Triggered
            | LegStatus::PartiallyFilled => Vec::new(),
        }
    }

    /// Actions after a leg's trigger fired and the leg was marked `Triggered`.
    ///
    /// An OCO sibling is cancelled before the fired leg is submitted; the
    /// coordinator holds the submission while the sibling is still working.
    #[must_use]
    pub fn on_trigger_fired(group: &OrderGroup, leg_id: &LegId) -> Vec<CascadeAction> {
        let mut actions = Vec::new();
        if let Some(sibling) = group.oco_sibling(leg_id) {
            if !sibling.status().is_terminal() {
                actions.push(cancel(sibling, CancelReason::cascade_cancel_sibling()));
            }
        }
        actions.push(CascadeAction::Submit {
            leg_id: leg_id.clone(),
        });
        actions
    }

    /// Actions that retry every fired leg still held behind its sibling,
    /// for when the sibling cancel failed the first time.
    #[must_use]
    pub fn on_held_retry(group: &OrderGroup) -> Vec<CascadeAction> {
        if group.is_terminal() {
            return Vec::new();
        }
        group
            .legs()
            .iter()
            .filter(|l| l.status() == LegStatus::Triggered)
            .flat_map(|l| Self::on_trigger_fired(group, l.id()))
            .collect()
    }

    /// Actions for a client cancel of the leg with `role`.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal, the role is absent, the leg
    /// already filled or closed, or the leg is an iceberg slice that is not
    /// currently open.
    pub fn on_user_cancel(
        group: &OrderGroup,
        role: LegRole,
    ) -> Result<Vec<CascadeAction>, OrderGroupError> {
        ensure_open(group)?;
        let leg = group
            .leg_by_role(role)
            .ok_or(OrderGroupError::RoleNotFound { role })?;
        match leg.status() {
            LegStatus::Filled => {
                return Err(OrderGroupError::TooLateToCancel {
                    leg_id: leg.id().clone(),
                })
            }
            LegStatus::Cancelled | LegStatus::Rejected => {
                return Err(OrderGroupError::LegAlreadyClosed {
                    leg_id: leg.id().clone(),
                    status: leg.status(),
                })
            }
            _ => {}
        }

        let user = CancelReason::user_requested();
        let actions = match role {
            LegRole::Slice(_) => {
                let is_open = group
                    .iceberg_plan()
                    .and_then(|p| p.open_slice())
                    .is_some_and(|s| &s.leg_id == leg.id());
                if !is_open {
                    return Err(OrderGroupError::NotOpenSlice {
                        leg_id: leg.id().clone(),
                    });
                }
                vec![cancel(leg, user)]
            }
            LegRole::Entry if group.kind().has_entry_and_exits() => {
                let mut actions = vec![cancel(leg, user)];
                actions.extend(Self::close_entry_dependents(group, leg));
                actions
            }
            LegRole::Target | LegRole::StopLoss => {
                // A partly filled entry is still working; its exits only
                // guard a position once it has filled.
                let entry = group.leg_by_role(LegRole::Entry);
                if entry.is_some_and(|e| e.status() == LegStatus::Filled) {
                    let mut actions = vec![cancel(leg, user)];
                    actions.extend(Self::square_off_rest(group, leg.id()));
                    actions
                } else {
                    vec![cancel(leg, user)]
                }
            }
            LegRole::Near | LegRole::Far => {
                let mut actions = vec![cancel(leg, user)];
                actions.extend(
                    live(group.spread_sibling(leg.id()))
                        .map(|s| cancel(s, CancelReason::dependency_cancelled())),
                );
                actions
            }
            LegRole::Entry | LegRole::OcoA | LegRole::OcoB => vec![cancel(leg, user)],
        };
        Ok(actions)
    }

    /// Actions to cancel the whole group.
    ///
    /// Every live leg is cancelled with `reason`; a filled entry position is
    /// squared off.
    ///
    /// # Errors
    ///
    /// Returns error if the group is already terminal.
    pub fn on_group_cancel(
        group: &OrderGroup,
        reason: CancelReason,
    ) -> Result<Vec<CascadeAction>, OrderGroupError> {
        ensure_open(group)?;

        if group.kind() == GroupKind::Iceberg {
            // Closing the open slice halts the plan, which closes the rest.
            let open = group
                .iceberg_plan()
                .and_then(|p| p.open_slice())
                .and_then(|s| group.leg(&s.leg_id));
            return Ok(live(open).map(|l| cancel(l, reason)).into_iter().collect());
        }

        let mut actions: Vec<CascadeAction> = group
            .legs()
            .iter()
            .filter(|l| !l.status().is_terminal())
            .map(|l| cancel(l, reason.clone()))
            .collect();
        if group.open_entry_position().is_positive() {
            actions.push(CascadeAction::SquareOff {
                reason: CancelReason::cascade_squareoff_entry(),
            });
        }
        Ok(actions)
    }

    // ========================================================================
    // Leg outcomes
    // ========================================================================

    fn on_leg_filled(group: &OrderGroup, leg: &Leg) -> Vec<CascadeAction> {
        match leg.role() {
            LegRole::Entry if group.kind().has_entry_and_exits() => {
                let exits: Vec<&Leg> = group
                    .dependents(leg.id())
                    .into_iter()
                    .filter(|d| d.status() == LegStatus::Created)
                    .collect();
                if exits.is_empty() {
                    // Exits were cancelled while the entry was working.
                    return vec![CascadeAction::SquareOff {
                        reason: CancelReason::cascade_squareoff_entry(),
                    }];
                }
                exits.into_iter().map(release).collect()
            }
            LegRole::Target | LegRole::StopLoss | LegRole::OcoA | LegRole::OcoB => {
                live(group.oco_sibling(leg.id()))
                    .map(|s| cancel(s, CancelReason::cascade_cancel_sibling()))
                    .into_iter()
                    .collect()
            }
            LegRole::Slice(_) => next_slice(group).into_iter().collect(),
            LegRole::Entry | LegRole::Near | LegRole::Far => Vec::new(),
        }
    }

    fn on_leg_rejected(group: &OrderGroup, leg: &Leg) -> Vec<CascadeAction> {
        match leg.role() {
            LegRole::Entry if group.kind().has_entry_and_exits() => {
                Self::close_entry_dependents(group, leg)
            }
            LegRole::Target | LegRole::StopLoss => Self::on_exit_closed(group, leg),
            LegRole::Near | LegRole::Far => live(group.spread_sibling(leg.id()))
                .map(|s| cancel(s, CancelReason::dependency_rejected()))
                .into_iter()
                .collect(),
            LegRole::Entry | LegRole::OcoA | LegRole::OcoB | LegRole::Slice(_) => Vec::new(),
        }
    }

    fn on_leg_cancelled(group: &OrderGroup, leg: &Leg) -> Vec<CascadeAction> {
        match leg.role() {
            LegRole::Entry if group.kind().has_entry_and_exits() => {
                Self::close_entry_dependents(group, leg)
            }
            LegRole::Target | LegRole::StopLoss => Self::on_exit_closed(group, leg),
            LegRole::Near | LegRole::Far => live(group.spread_sibling(leg.id()))
                .map(|s| cancel(s, CancelReason::dependency_cancelled()))
                .into_iter()
                .collect(),
            LegRole::Entry | LegRole::OcoA | LegRole::OcoB | LegRole::Slice(_) => Vec::new(),
        }
    }

    /// An exit partly filled. Every live exit shrinks to its own fills plus
    /// the position still open; with nothing left open they are cancelled.
    fn fit_exits(group: &OrderGroup) -> Vec<CascadeAction> {
        let open = group.open_entry_position();
        group
            .legs()
            .iter()
            .filter(|l| l.role().is_exit() && !l.status().is_terminal())
            .filter_map(|l| {
                if !open.is_positive() {
                    return Some(cancel(l, CancelReason::cascade_cancel_sibling()));
                }
                let quantity = l.filled_quantity() + open;
                (quantity < l.ordered_quantity()).then(|| CascadeAction::Resize {
                    leg_id: l.id().clone(),
                    quantity,
                })
            })
            .collect()
    }

    /// An exit closed without filling.
    fn on_exit_closed(group: &OrderGroup, leg: &Leg) -> Vec<CascadeAction> {
        let sibling = group.oco_sibling(leg.id());
        if let Some(s) = sibling {
            if s.status() == LegStatus::Triggered {
                // A fired trailing stop was waiting for this leg to close.
                return vec![CascadeAction::Submit {
                    leg_id: s.id().clone(),
                }];
            }
        }
        if !group.open_entry_position().is_positive() {
            return Vec::new();
        }
        let reason = CancelReason::cascade_squareoff_entry();
        let mut actions: Vec<CascadeAction> =
            live(sibling).map(|s| cancel(s, reason.clone())).into_iter().collect();
        actions.push(CascadeAction::SquareOff { reason });
        actions
    }

    /// The entry closed; close its exits and flatten any partial position.
    fn close_entry_dependents(group: &OrderGroup, entry: &Leg) -> Vec<CascadeAction> {
        if entry.filled_quantity().is_positive() {
            return Self::square_off_rest(group, entry.id());
        }
        let reason = if entry.status() == LegStatus::Rejected {
            CancelReason::dependency_rejected()
        } else {
            CancelReason::dependency_cancelled()
        };
        group
            .dependents(entry.id())
            .into_iter()
            .filter(|d| !d.status().is_terminal())
            .map(|d| cancel(d, reason.clone()))
            .collect()
    }

    /// Close every live leg other than `skip` and square off.
    fn square_off_rest(group: &OrderGroup, skip: &LegId) -> Vec<CascadeAction> {
        let reason = CancelReason::cascade_squareoff_entry();
        let mut actions: Vec<CascadeAction> = group
            .legs()
            .iter()
            .filter(|l| !l.status().is_terminal() && l.id() != skip)
            .map(|l| cancel(l, reason.clone()))
            .collect();
        actions.push(CascadeAction::SquareOff { reason });
        actions
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_open(group: &OrderGroup) -> Result<(), OrderGroupError> {
    if group.is_terminal() {
        return Err(OrderGroupError::GroupTerminal {
            group_id: group.id().clone(),
            status: group.status(),
        });
    }
    Ok(())
}

fn release(leg: &Leg) -> CascadeAction {
    let leg_id = leg.id().clone();
    if leg.is_trigger_held() {
        CascadeAction::ArmTrigger { leg_id }
    } else {
        CascadeAction::Submit { leg_id }
    }
}

fn cancel(leg: &Leg, reason: CancelReason) -> CascadeAction {
    CascadeAction::Cancel {
        leg_id: leg.id().clone(),
        reason,
    }
}

fn live(leg: Option<&Leg>) -> Option<&Leg> {
    leg.filter(|l| !l.status().is_terminal())
}

fn next_slice(group: &OrderGroup) -> Option<CascadeAction> {
    let slice = group.iceberg_plan()?.open_slice()?;
    let leg = group.leg(&slice.leg_id)?;
    (leg.status() == LegStatus::Created).then(|| CascadeAction::Submit {
        leg_id: leg.id().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::iceberg::IcebergSlicer;
    use crate::domain::order_group::aggregate::{
        CreateGroupCommand, GroupParams, GttOcoLegSpec, OrderPricing, SpreadLegSpec, StopLossSpec,
    };
    use crate::domain::order_group::value_objects::{
        ExecutionKind, ExecutionReport, OrderSide, ProductType,
    };
    use crate::domain::shared::{
        ClientId, EventId, Exchange, ExchangeOrderId, InstrumentId, Price, Quantity,
    };
    use rust_decimal_macros::dec;

    fn group(params: GroupParams, quantity: i64) -> OrderGroup {
        OrderGroup::new(
            CreateGroupCommand {
                client_id: ClientId::new("C1"),
                instrument: InstrumentId::new("INFY"),
                exchange: Exchange::Nse,
                product: ProductType::Intraday,
                side: OrderSide::Buy,
                quantity: Quantity::from_i64(quantity),
                expires_at: None,
                params,
            },
            &IcebergSlicer::default(),
        )
        .unwrap()
    }

    fn bracket(trailing: Option<rust_decimal::Decimal>) -> OrderGroup {
        group(
            GroupParams::Bracket {
                entry: OrderPricing::limit(Price::from_i64(100)),
                target_price: Price::from_i64(110),
                stop_loss: StopLossSpec {
                    trigger_price: Price::from_i64(95),
                    limit_price: None,
                    trailing_offset: trailing,
                },
            },
            10,
        )
    }

    fn id_of(group: &OrderGroup, role: LegRole) -> LegId {
        group.leg_by_role(role).unwrap().id().clone()
    }

    fn submit(group: &mut OrderGroup, role: LegRole) {
        let id = id_of(group, role);
        group
            .mark_leg_submitted(&id, ExchangeOrderId::new(format!("EX-{role}")))
            .unwrap();
    }

    fn execute(group: &mut OrderGroup, role: LegRole, kind: ExecutionKind) -> LegUpdate {
        let report = ExecutionReport::new(
            EventId::generate(),
            ExchangeOrderId::new(format!("EX-{role}")),
            kind,
        );
        match group.apply_execution(&report).unwrap() {
            crate::domain::order_group::aggregate::ExecutionOutcome::Applied(u) => u,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn filled_entry(trailing: Option<rust_decimal::Decimal>) -> (OrderGroup, LegUpdate) {
        let mut g = bracket(trailing);
        submit(&mut g, LegRole::Entry);
        let update = execute(&mut g, LegRole::Entry, ExecutionKind::Filled { price: None });
        (g, update)
    }

    #[test]
    fn bracket_submits_only_entry_on_create() {
        let g = bracket(None);
        assert_eq!(
            CascadePolicy::on_created(&g),
            vec![CascadeAction::Submit {
                leg_id: id_of(&g, LegRole::Entry)
            }]
        );
    }

    #[test]
    fn entry_fill_releases_both_exits() {
        let (g, update) = filled_entry(None);
        let actions = CascadePolicy::on_leg_update(&g, &update);
        assert_eq!(
            actions,
            vec![
                CascadeAction::Submit {
                    leg_id: id_of(&g, LegRole::Target)
                },
                CascadeAction::Submit {
                    leg_id: id_of(&g, LegRole::StopLoss)
                },
            ]
        );
    }

    #[test]
    fn entry_fill_arms_trailing_stop() {
        let (g, update) = filled_entry(Some(dec!(2)));
        let actions = CascadePolicy::on_leg_update(&g, &update);
        assert!(actions.contains(&CascadeAction::ArmTrigger {
            leg_id: id_of(&g, LegRole::StopLoss)
        }));
    }

    #[test]
    fn target_fill_cancels_stop_loss() {
        let (mut g, _) = filled_entry(None);
        submit(&mut g, LegRole::Target);
        submit(&mut g, LegRole::StopLoss);
        let update = execute(&mut g, LegRole::Target, ExecutionKind::Filled { price: None });

        assert_eq!(
            CascadePolicy::on_leg_update(&g, &update),
            vec![CascadeAction::Cancel {
                leg_id: id_of(&g, LegRole::StopLoss),
                reason: CancelReason::cascade_cancel_sibling(),
            }]
        );
    }

    #[test]
    fn duplicate_fill_update_produces_nothing() {
        let (mut g, _) = filled_entry(None);
        let update = execute(&mut g, LegRole::Entry, ExecutionKind::Filled { price: None });
        assert!(!update.changed());
        assert!(CascadePolicy::on_leg_update(&g, &update).is_empty());
    }

    #[test]
    fn user_cancel_of_exit_after_entry_fill_squares_off() {
        let (mut g, _) = filled_entry(None);
        submit(&mut g, LegRole::Target);
        submit(&mut g, LegRole::StopLoss);

        let actions = CascadePolicy::on_user_cancel(&g, LegRole::StopLoss).unwrap();
        assert_eq!(
            actions,
            vec![
                CascadeAction::Cancel {
                    leg_id: id_of(&g, LegRole::StopLoss),
                    reason: CancelReason::user_requested(),
                },
                CascadeAction::Cancel {
                    leg_id: id_of(&g, LegRole::Target),
                    reason: CancelReason::cascade_squareoff_entry(),
                },
                CascadeAction::SquareOff {
                    reason: CancelReason::cascade_squareoff_entry()
                },
            ]
        );
    }

    #[test]
    fn user_cancel_of_exit_while_entry_open_is_plain() {
        let mut g = bracket(None);
        submit(&mut g, LegRole::Entry);
        let actions = CascadePolicy::on_user_cancel(&g, LegRole::Target).unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn user_cancel_of_exit_while_entry_part_filled_is_plain() {
        let mut g = bracket(None);
        submit(&mut g, LegRole::Entry);
        execute(
            &mut g,
            LegRole::Entry,
            ExecutionKind::PartialFill {
                quantity: Quantity::from_i64(4),
                price: None,
            },
        );
        assert_eq!(
            CascadePolicy::on_user_cancel(&g, LegRole::Target).unwrap(),
            vec![CascadeAction::Cancel {
                leg_id: id_of(&g, LegRole::Target),
                reason: CancelReason::user_requested(),
            }]
        );
    }

    #[test]
    fn partial_exit_fill_shrinks_the_other_exit() {
        let (mut g, _) = filled_entry(None);
        submit(&mut g, LegRole::Target);
        submit(&mut g, LegRole::StopLoss);
        let update = execute(
            &mut g,
            LegRole::Target,
            ExecutionKind::PartialFill {
                quantity: Quantity::from_i64(4),
                price: None,
            },
        );

        assert_eq!(
            CascadePolicy::on_leg_update(&g, &update),
            vec![CascadeAction::Resize {
                leg_id: id_of(&g, LegRole::StopLoss),
                quantity: Quantity::from_i64(6),
            }]
        );
    }

    #[test]
    fn partial_exit_fills_closing_the_position_cancel_the_rest() {
        let (mut g, _) = filled_entry(None);
        submit(&mut g, LegRole::Target);
        submit(&mut g, LegRole::StopLoss);
        let stop = id_of(&g, LegRole::StopLoss);
        execute(
            &mut g,
            LegRole::Target,
            ExecutionKind::PartialFill {
                quantity: Quantity::from_i64(4),
                price: None,
            },
        );
        g.resize_exit(&stop, Quantity::from_i64(7)).unwrap();
        let update = execute(
            &mut g,
            LegRole::StopLoss,
            ExecutionKind::PartialFill {
                quantity: Quantity::from_i64(6),
                price: None,
            },
        );

        let actions = CascadePolicy::on_leg_update(&g, &update);
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| matches!(
            a,
            CascadeAction::Cancel { reason, .. } if reason.code == CancelReason::CASCADE_CANCEL_SIBLING
        )));
    }

    #[test]
    fn partial_entry_fill_produces_nothing() {
        let mut g = bracket(None);
        submit(&mut g, LegRole::Entry);
        let update = execute(
            &mut g,
            LegRole::Entry,
            ExecutionKind::PartialFill {
                quantity: Quantity::from_i64(4),
                price: None,
            },
        );
        assert!(CascadePolicy::on_leg_update(&g, &update).is_empty());
    }

    #[test]
    fn held_retry_cancels_the_sibling_again_and_submits() {
        let (mut g, _) = filled_entry(Some(dec!(2)));
        submit(&mut g, LegRole::Target);
        assert!(CascadePolicy::on_held_retry(&g).is_empty());

        let sl = id_of(&g, LegRole::StopLoss);
        g.mark_leg_triggered(&sl, Price::from_i64(95)).unwrap();
        assert_eq!(
            CascadePolicy::on_held_retry(&g),
            vec![
                CascadeAction::Cancel {
                    leg_id: id_of(&g, LegRole::Target),
                    reason: CancelReason::cascade_cancel_sibling(),
                },
                CascadeAction::Submit { leg_id: sl },
            ]
        );
    }

    #[test]
    fn user_cancel_of_open_entry_cancels_dependents() {
        let mut g = bracket(None);
        submit(&mut g, LegRole::Entry);
        let actions = CascadePolicy::on_user_cancel(&g, LegRole::Entry).unwrap();
        assert_eq!(actions.len(), 3);
        assert!(actions.iter().skip(1).all(|a| matches!(
            a,
            CascadeAction::Cancel { reason, .. } if reason.code == CancelReason::CASCADE_DEPENDENCY_CANCELLED
        )));
    }

    #[test]
    fn user_cancel_of_partially_filled_entry_squares_off() {
        let mut g = bracket(None);
        submit(&mut g, LegRole::Entry);
        execute(
            &mut g,
            LegRole::Entry,
            ExecutionKind::PartialFill {
                quantity: Quantity::from_i64(4),
                price: None,
            },
        );
        let actions = CascadePolicy::on_user_cancel(&g, LegRole::Entry).unwrap();
        assert!(matches!(actions.last(), Some(CascadeAction::SquareOff { .. })));
    }

    #[test]
    fn user_cancel_of_filled_leg_is_too_late() {
        let (g, _) = filled_entry(None);
        let err = CascadePolicy::on_user_cancel(&g, LegRole::Entry).unwrap_err();
        assert!(matches!(err, OrderGroupError::TooLateToCancel { .. }));
    }

    #[test]
    fn entry_reject_cancels_dependents_with_reject_reason() {
        let mut g = bracket(None);
        submit(&mut g, LegRole::Entry);
        let update = execute(
            &mut g,
            LegRole::Entry,
            ExecutionKind::Rejected {
                reason: crate::domain::order_group::value_objects::RejectReason::exchange_rejected(
                    "margin",
                ),
            },
        );
        let actions = CascadePolicy::on_leg_update(&g, &update);
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| matches!(
            a,
            CascadeAction::Cancel { reason, .. } if reason.code == CancelReason::CASCADE_DEPENDENCY_REJECTED
        )));
    }

    #[test]
    fn fired_trailing_stop_cancels_target_before_submitting() {
        let (mut g, _) = filled_entry(Some(dec!(2)));
        submit(&mut g, LegRole::Target);
        let sl = id_of(&g, LegRole::StopLoss);
        g.mark_leg_triggered(&sl, Price::from_i64(95)).unwrap();

        assert_eq!(
            CascadePolicy::on_trigger_fired(&g, &sl),
            vec![
                CascadeAction::Cancel {
                    leg_id: id_of(&g, LegRole::Target),
                    reason: CancelReason::cascade_cancel_sibling(),
                },
                CascadeAction::Submit { leg_id: sl },
            ]
        );
    }

    #[test]
    fn exchange_cancel_of_target_releases_fired_stop() {
        let (mut g, _) = filled_entry(Some(dec!(2)));
        submit(&mut g, LegRole::Target);
        let sl = id_of(&g, LegRole::StopLoss);
        g.mark_leg_triggered(&sl, Price::from_i64(95)).unwrap();

        let update = execute(&mut g, LegRole::Target, ExecutionKind::CancelledAck);
        assert_eq!(
            CascadePolicy::on_leg_update(&g, &update),
            vec![CascadeAction::Submit { leg_id: sl }]
        );
    }

    #[test]
    fn exchange_cancel_of_exit_with_open_position_squares_off() {
        let (mut g, _) = filled_entry(None);
        submit(&mut g, LegRole::Target);
        submit(&mut g, LegRole::StopLoss);
        let update = execute(&mut g, LegRole::StopLoss, ExecutionKind::CancelledAck);

        let actions = CascadePolicy::on_leg_update(&g, &update);
        assert_eq!(
            actions,
            vec![
                CascadeAction::Cancel {
                    leg_id: id_of(&g, LegRole::Target),
                    reason: CancelReason::cascade_squareoff_entry(),
                },
                CascadeAction::SquareOff {
                    reason: CancelReason::cascade_squareoff_entry()
                },
            ]
        );
    }

    #[test]
    fn gtt_oco_arms_both_legs() {
        let g = group(
            GroupParams::GttOco {
                upper: GttOcoLegSpec {
                    trigger_price: Price::from_i64(120),
                    pricing: OrderPricing::market(),
                },
                lower: GttOcoLegSpec {
                    trigger_price: Price::from_i64(90),
                    pricing: OrderPricing::market(),
                },
            },
            5,
        );
        let actions = CascadePolicy::on_created(&g);
        assert_eq!(actions.len(), 2);
        assert!(actions
            .iter()
            .all(|a| matches!(a, CascadeAction::ArmTrigger { .. })));
    }

    #[test]
    fn spread_reject_cancels_sibling() {
        let mut g = group(
            GroupParams::Spread {
                near: OrderPricing::market(),
                far: SpreadLegSpec {
                    instrument: InstrumentId::new("INFY-FUT"),
                    side: OrderSide::Sell,
                    pricing: OrderPricing::market(),
                },
            },
            10,
        );
        submit(&mut g, LegRole::Near);
        submit(&mut g, LegRole::Far);
        let update = execute(
            &mut g,
            LegRole::Near,
            ExecutionKind::Rejected {
                reason: crate::domain::order_group::value_objects::RejectReason::exchange_rejected(
                    "price band",
                ),
            },
        );
        assert_eq!(
            CascadePolicy::on_leg_update(&g, &update),
            vec![CascadeAction::Cancel {
                leg_id: id_of(&g, LegRole::Far),
                reason: CancelReason::dependency_rejected(),
            }]
        );
    }

    #[test]
    fn iceberg_fill_submits_next_slice() {
        let mut g = group(
            GroupParams::Iceberg {
                disclose_quantity: Quantity::from_i64(100),
                pricing: OrderPricing::limit(Price::from_i64(50)),
            },
            250,
        );
        assert_eq!(
            CascadePolicy::on_created(&g),
            vec![CascadeAction::Submit {
                leg_id: id_of(&g, LegRole::Slice(1))
            }]
        );
        submit(&mut g, LegRole::Slice(1));
        let update = execute(&mut g, LegRole::Slice(1), ExecutionKind::Filled { price: None });
        assert_eq!(
            CascadePolicy::on_leg_update(&g, &update),
            vec![CascadeAction::Submit {
                leg_id: id_of(&g, LegRole::Slice(2))
            }]
        );
    }

    #[test]
    fn cancelling_unreleased_slice_is_rejected() {
        let g = group(
            GroupParams::Iceberg {
                disclose_quantity: Quantity::from_i64(100),
                pricing: OrderPricing::market(),
            },
            300,
        );
        let err = CascadePolicy::on_user_cancel(&g, LegRole::Slice(3)).unwrap_err();
        assert!(matches!(err, OrderGroupError::NotOpenSlice { .. }));
    }

    #[test]
    fn group_cancel_squares_off_filled_entry() {
        let (mut g, _) = filled_entry(None);
        submit(&mut g, LegRole::Target);
        submit(&mut g, LegRole::StopLoss);
        let actions = CascadePolicy::on_group_cancel(&g, CancelReason::expired()).unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(
            actions.last(),
            Some(&CascadeAction::SquareOff {
                reason: CancelReason::cascade_squareoff_entry()
            })
        );
    }
}
