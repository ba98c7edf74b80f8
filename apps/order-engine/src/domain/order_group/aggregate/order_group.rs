//! Order Group Aggregate Root
//!
//! An order group owns every leg of a conditional order (bracket, cover,
//! spread, GTT, GTT-OCO or iceberg). All leg transitions go through this
//! aggregate so status derivation, idempotency and the terminal freeze are
//! enforced in one place.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::command::{CreateGroupCommand, GroupParams, OrderPricing, StopLossSpec};
use super::leg::{Leg, LegTemplate};
use super::modification::LegModification;
use crate::domain::iceberg::{IcebergPlan, IcebergSlicer, SliceDecision};
use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::order_group::events::{
    GroupClosed, GroupCreated, GroupEvent, LegCancelled, LegFilled, LegModified,
    LegPartiallyFilled, LegRejected, LegSubmitted, LegTriggered, SquareOffIssued,
    TriggerAdjusted,
};
use crate::domain::order_group::services::GroupStatusDeriver;
use crate::domain::order_group::value_objects::{
    CancelReason, ExecutionKind, ExecutionReport, GroupKind, GroupStatus, LegRole, LegStatus,
    OrderSide, OrderType, ProductType, RejectReason,
};
use crate::domain::shared::{
    ClientId, Exchange, ExchangeOrderId, GroupId, InstrumentId, LegId, Price, Quantity, Timestamp,
};
use crate::domain::triggers::TriggerOperator;

/// Square-off order issued to flatten the entry position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareOffRecord {
    /// Exchange order carrying the square-off.
    pub exchange_order_id: ExchangeOrderId,
    /// Quantity squared off.
    pub quantity: Quantity,
    /// Why.
    pub reason: CancelReason,
    /// When.
    pub issued_at: Timestamp,
}

/// A leg status change produced by an aggregate operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegUpdate {
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Status before.
    pub previous: LegStatus,
    /// Status after.
    pub current: LegStatus,
}

impl LegUpdate {
    /// Returns true if the status moved (a partial fill on a partially
    /// filled leg counts as movement).
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.current || self.current == LegStatus::PartiallyFilled
    }
}

/// Result of applying an execution report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The report was seen before; nothing changed.
    Duplicate,
    /// The report was applied.
    Applied(LegUpdate),
}

/// Order Group Aggregate Root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderGroup {
    id: GroupId,
    client_id: ClientId,
    kind: GroupKind,
    instrument: InstrumentId,
    exchange: Exchange,
    product: ProductType,
    side: OrderSide,
    total_quantity: Quantity,
    legs: Vec<Leg>,
    status: GroupStatus,
    iceberg_plan: Option<IcebergPlan>,
    applied_events: BTreeSet<String>,
    square_off: Option<SquareOffRecord>,
    close_reason: Option<CancelReason>,
    expires_at: Option<Timestamp>,
    #[serde(skip)]
    events: Vec<GroupEvent>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl OrderGroup {
    /// Create a group and all of its legs from a command.
    ///
    /// Iceberg groups release their first slice immediately.
    /// Generates a `GroupCreated` event.
    ///
    /// # Errors
    ///
    /// Returns error if the command is structurally invalid or the iceberg
    /// plan cannot be built.
    pub fn new(cmd: CreateGroupCommand, slicer: &IcebergSlicer) -> Result<Self, OrderGroupError> {
        cmd.validate()?;

        let id = GroupId::generate();
        let now = Timestamp::now();
        let kind = cmd.kind();

        let (templates, iceberg_plan) = match &cmd.params {
            GroupParams::Iceberg {
                disclose_quantity,
                pricing,
            } => {
                let mut plan = slicer.create_plan(id.clone(), cmd.quantity, *disclose_quantity)?;
                let templates = plan
                    .slices()
                    .iter()
                    .map(|slice| {
                        let mut t = plain_leg(
                            LegRole::Slice(slice.number),
                            &cmd.instrument,
                            cmd.side,
                            slice.quantity,
                            *pricing,
                        );
                        t.id = slice.leg_id.clone();
                        t
                    })
                    .collect();
                plan.start()?;
                (templates, Some(plan))
            }
            params => (leg_templates(&cmd, params), None),
        };

        let legs: Vec<Leg> = templates
            .into_iter()
            .map(|t| Leg::new(id.clone(), t))
            .collect();

        let mut group = Self {
            id: id.clone(),
            client_id: cmd.client_id.clone(),
            kind,
            instrument: cmd.instrument.clone(),
            exchange: cmd.exchange,
            product: cmd.product,
            side: cmd.side,
            total_quantity: cmd.quantity,
            legs,
            status: GroupStatus::Pending,
            iceberg_plan,
            applied_events: BTreeSet::new(),
            square_off: None,
            close_reason: None,
            expires_at: cmd.expires_at,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        group.events.push(GroupEvent::GroupCreated(GroupCreated {
            group_id: id,
            client_id: cmd.client_id,
            kind,
            instrument: cmd.instrument,
            quantity: cmd.quantity,
            leg_count: group.legs.len(),
            occurred_at: now,
        }));

        Ok(group)
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Group id.
    #[must_use]
    pub const fn id(&self) -> &GroupId {
        &self.id
    }

    /// Client.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Kind.
    #[must_use]
    pub const fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Primary instrument.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Exchange.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Product.
    #[must_use]
    pub const fn product(&self) -> ProductType {
        self.product
    }

    /// Side of the opening leg(s).
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Total quantity.
    #[must_use]
    pub const fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Legs in creation order.
    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Aggregate status.
    #[must_use]
    pub const fn status(&self) -> GroupStatus {
        self.status
    }

    /// Returns true once the group is frozen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Iceberg plan, for iceberg groups.
    #[must_use]
    pub const fn iceberg_plan(&self) -> Option<&IcebergPlan> {
        self.iceberg_plan.as_ref()
    }

    /// Square-off issued for this group, if any.
    #[must_use]
    pub const fn square_off(&self) -> Option<&SquareOffRecord> {
        self.square_off.as_ref()
    }

    /// Reason the group closed.
    #[must_use]
    pub const fn close_reason(&self) -> Option<&CancelReason> {
        self.close_reason.as_ref()
    }

    /// Expiry.
    #[must_use]
    pub const fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Last update.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Applied idempotency keys.
    #[must_use]
    pub const fn applied_events(&self) -> &BTreeSet<String> {
        &self.applied_events
    }

    /// Look up a leg.
    #[must_use]
    pub fn leg(&self, leg_id: &LegId) -> Option<&Leg> {
        self.legs.iter().find(|l| l.id() == leg_id)
    }

    /// Look up a leg by role.
    #[must_use]
    pub fn leg_by_role(&self, role: LegRole) -> Option<&Leg> {
        self.legs.iter().find(|l| l.role() == role)
    }

    /// OCO sibling of a leg (Target/StopLoss, OcoA/OcoB).
    #[must_use]
    pub fn oco_sibling(&self, leg_id: &LegId) -> Option<&Leg> {
        let role = self.leg(leg_id)?.role().oco_sibling()?;
        self.leg_by_role(role)
    }

    /// The other leg of a spread.
    #[must_use]
    pub fn spread_sibling(&self, leg_id: &LegId) -> Option<&Leg> {
        let role = self.leg(leg_id)?.role().spread_sibling()?;
        self.leg_by_role(role)
    }

    /// Legs waiting on `leg_id`.
    #[must_use]
    pub fn dependents(&self, leg_id: &LegId) -> Vec<&Leg> {
        self.legs
            .iter()
            .filter(|l| l.depends_on() == Some(leg_id))
            .collect()
    }

    /// Quantity filled across opening legs.
    #[must_use]
    pub fn filled_quantity(&self) -> Quantity {
        self.legs
            .iter()
            .filter(|l| l.role().is_opening())
            .map(Leg::filled_quantity)
            .sum()
    }

    /// Open entry position of a BO/CO group that has not been closed by an
    /// exit fill or a square-off.
    #[must_use]
    pub fn open_entry_position(&self) -> Quantity {
        if !self.kind.has_entry_and_exits() || self.square_off.is_some() {
            return Quantity::ZERO;
        }
        let exits_filled: Quantity = self
            .legs
            .iter()
            .filter(|l| l.role().is_exit())
            .map(Leg::filled_quantity)
            .sum();
        self.leg_by_role(LegRole::Entry)
            .map_or(Quantity::ZERO, |entry| {
                entry.filled_quantity().saturating_sub(exits_filled)
            })
    }

    /// Returns true if the group's expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Record that a leg's local trigger fired.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal or the leg is not `Created`.
    pub fn mark_leg_triggered(
        &mut self,
        leg_id: &LegId,
        ltp: Price,
    ) -> Result<LegUpdate, OrderGroupError> {
        self.ensure_mutable()?;
        let idx = self.index_of(leg_id)?;
        let previous = self.legs[idx].status();
        self.legs[idx].mark_triggered()?;

        self.touch();
        let leg = &self.legs[idx];
        self.events.push(GroupEvent::LegTriggered(LegTriggered {
            group_id: self.id.clone(),
            leg_id: leg.id().clone(),
            role: leg.role(),
            trigger_price: leg.trigger_price().unwrap_or(ltp),
            ltp,
            occurred_at: self.updated_at,
        }));
        let update = self.update_for(idx, previous);
        self.refresh_status();
        Ok(update)
    }

    /// Record the adapter's acknowledgement of a submission.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal or the leg cannot be submitted.
    pub fn mark_leg_submitted(
        &mut self,
        leg_id: &LegId,
        exchange_order_id: ExchangeOrderId,
    ) -> Result<LegUpdate, OrderGroupError> {
        self.ensure_mutable()?;
        let idx = self.index_of(leg_id)?;
        let previous = self.legs[idx].status();
        self.legs[idx].mark_submitted(exchange_order_id.clone())?;

        self.touch();
        let leg = &self.legs[idx];
        self.events.push(GroupEvent::LegSubmitted(LegSubmitted {
            group_id: self.id.clone(),
            leg_id: leg.id().clone(),
            role: leg.role(),
            exchange_order_id,
            quantity: leg.ordered_quantity(),
            occurred_at: self.updated_at,
        }));
        let update = self.update_for(idx, previous);
        self.refresh_status();
        Ok(update)
    }

    /// Move a trailing trigger.
    ///
    /// A trigger only tightens: a sell stop moves up, a buy stop moves down.
    /// Moving to the recorded price is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal, the leg already left `Created`,
    /// or the move would loosen the trigger.
    pub fn adjust_trigger(&mut self, leg_id: &LegId, current: Price) -> Result<(), OrderGroupError> {
        self.ensure_mutable()?;
        let idx = self.index_of(leg_id)?;
        let leg = &mut self.legs[idx];
        if leg.status() != LegStatus::Created {
            return Err(OrderGroupError::ModificationNotAllowed {
                leg_id: leg_id.clone(),
                reason: format!("trigger cannot move once leg is {}", leg.status()),
            });
        }
        let previous = leg.trigger_price().unwrap_or(current);
        if previous == current {
            return Ok(());
        }
        let loosens = match leg.trigger_operator() {
            Some(TriggerOperator::AtOrBelow) => current < previous,
            Some(TriggerOperator::AtOrAbove) => current > previous,
            None => false,
        };
        if loosens {
            return Err(OrderGroupError::ModificationNotAllowed {
                leg_id: leg_id.clone(),
                reason: format!("trigger would loosen from {previous} to {current}"),
            });
        }
        leg.set_trigger_price(current);

        self.touch();
        self.events.push(GroupEvent::TriggerAdjusted(TriggerAdjusted {
            group_id: self.id.clone(),
            leg_id: leg_id.clone(),
            previous,
            current,
            occurred_at: self.updated_at,
        }));
        Ok(())
    }

    /// Apply an execution report from the adapter's event stream.
    ///
    /// A report whose idempotency key was already applied is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal, no leg carries the exchange
    /// order, or the report contradicts the leg's state.
    pub fn apply_execution(
        &mut self,
        report: &ExecutionReport,
    ) -> Result<ExecutionOutcome, OrderGroupError> {
        let key = report.idempotency_key();
        if self.applied_events.contains(&key) {
            return Ok(ExecutionOutcome::Duplicate);
        }
        self.ensure_mutable()?;

        let idx = self
            .legs
            .iter()
            .position(|l| l.exchange_order_id() == Some(&report.exchange_order_id))
            .ok_or_else(|| OrderGroupError::UnknownExchangeOrder {
                exchange_order_id: report.exchange_order_id.clone(),
            })?;
        let previous = self.legs[idx].status();

        match &report.kind {
            ExecutionKind::PartialFill { quantity, price } => {
                self.fill_leg(idx, *quantity, *price)?;
            }
            ExecutionKind::Filled { price } => {
                // A second terminal fill report for the same order carries no new quantity.
                if previous != LegStatus::Filled {
                    let remaining = self.legs[idx].remaining_quantity();
                    self.fill_leg(idx, remaining, *price)?;
                }
            }
            ExecutionKind::Rejected { reason } => {
                self.reject_at(idx, reason.clone())?;
            }
            ExecutionKind::CancelledAck => {
                if !previous.is_terminal() {
                    self.cancel_at(idx, CancelReason::exchange_cancelled())?;
                }
            }
        }

        self.applied_events.insert(key);
        self.touch();
        let update = self.update_for(idx, previous);
        self.refresh_status();
        Ok(ExecutionOutcome::Applied(update))
    }

    /// Cancel a leg.
    ///
    /// Closing the open iceberg slice halts the plan and closes every
    /// unreleased slice with `ICEBERG_HALTED`.
    ///
    /// # Errors
    ///
    /// Returns `TooLateToCancel` if the leg filled, `LegAlreadyClosed` if it
    /// was cancelled or rejected, or `GroupTerminal`.
    pub fn cancel_leg(
        &mut self,
        leg_id: &LegId,
        reason: CancelReason,
    ) -> Result<LegUpdate, OrderGroupError> {
        self.ensure_mutable()?;
        let idx = self.index_of(leg_id)?;
        let previous = self.legs[idx].status();
        match previous {
            LegStatus::Filled => {
                return Err(OrderGroupError::TooLateToCancel {
                    leg_id: leg_id.clone(),
                })
            }
            LegStatus::Cancelled | LegStatus::Rejected => {
                return Err(OrderGroupError::LegAlreadyClosed {
                    leg_id: leg_id.clone(),
                    status: previous,
                })
            }
            _ => {}
        }

        self.cancel_at(idx, reason)?;
        self.touch();
        let update = self.update_for(idx, previous);
        self.refresh_status();
        Ok(update)
    }

    /// Reject a leg whose submission the adapter refused.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal or the leg cannot be rejected.
    pub fn reject_leg(
        &mut self,
        leg_id: &LegId,
        reason: RejectReason,
    ) -> Result<LegUpdate, OrderGroupError> {
        self.ensure_mutable()?;
        let idx = self.index_of(leg_id)?;
        let previous = self.legs[idx].status();

        self.reject_at(idx, reason)?;
        self.touch();
        let update = self.update_for(idx, previous);
        self.refresh_status();
        Ok(update)
    }

    /// Modify an unfilled leg.
    ///
    /// A quantity change on a BO/CO entry propagates to its exit legs.
    ///
    /// # Errors
    ///
    /// Returns error if the leg is filled, closed, an iceberg slice, or the
    /// requested field cannot change on this leg.
    pub fn modify_leg(
        &mut self,
        leg_id: &LegId,
        modification: &LegModification,
    ) -> Result<(), OrderGroupError> {
        self.ensure_mutable()?;
        modification.validate()?;
        let idx = self.index_of(leg_id)?;

        let not_allowed = |reason: &str| OrderGroupError::ModificationNotAllowed {
            leg_id: leg_id.clone(),
            reason: reason.to_string(),
        };

        let leg = &self.legs[idx];
        if leg.status().is_terminal() {
            return Err(not_allowed(&format!("leg is {}", leg.status())));
        }
        if leg.status() == LegStatus::Triggered {
            return Err(not_allowed("leg trigger already fired"));
        }
        if leg.filled_quantity().is_positive() {
            return Err(not_allowed("leg has fills"));
        }
        if matches!(leg.role(), LegRole::Slice(_)) {
            return Err(not_allowed("iceberg slices cannot be modified"));
        }
        if modification.trailing_offset.is_some() && !leg.is_trailing() {
            return Err(not_allowed("leg does not trail"));
        }
        if modification.trigger_price.is_some()
            && leg.trigger_price().is_none()
            && !leg.order_type().requires_trigger()
        {
            return Err(not_allowed("leg has no trigger"));
        }
        let role = leg.role();
        if modification.quantity.is_some() {
            let allowed = (self.kind.has_entry_and_exits() && role == LegRole::Entry)
                || self.kind == GroupKind::Gtt;
            if !allowed {
                return Err(not_allowed("quantity can only change on a BO/CO entry or a GTT leg"));
            }
        }

        let leg = &mut self.legs[idx];
        if let Some(price) = modification.price {
            leg.set_price(price);
        }
        if let Some(trigger) = modification.trigger_price {
            leg.set_trigger_price(trigger);
        }
        if let Some(offset) = modification.trailing_offset {
            leg.set_trailing_offset(offset);
        }
        if let Some(quantity) = modification.quantity {
            leg.set_quantity(quantity);
            self.total_quantity = quantity;
            if role == LegRole::Entry {
                for exit in self
                    .legs
                    .iter_mut()
                    .filter(|l| l.role().is_exit() && l.status() == LegStatus::Created)
                {
                    exit.set_quantity(quantity);
                }
            }
        }

        self.touch();
        let leg = &self.legs[idx];
        self.events.push(GroupEvent::LegModified(LegModified {
            group_id: self.id.clone(),
            leg_id: leg.id().clone(),
            role: leg.role(),
            price: leg.price(),
            trigger_price: leg.trigger_price(),
            quantity: leg.ordered_quantity(),
            occurred_at: self.updated_at,
        }));
        Ok(())
    }

    /// Shrink a live exit to `quantity` after the other exit partly closed
    /// the position.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal, the leg is not a live exit, or
    /// `quantity` is not below the ordered quantity and at or above the
    /// leg's fills.
    pub fn resize_exit(&mut self, leg_id: &LegId, quantity: Quantity) -> Result<(), OrderGroupError> {
        self.ensure_mutable()?;
        let idx = self.index_of(leg_id)?;
        let leg = &mut self.legs[idx];
        let reason = if !leg.role().is_exit() {
            Some("only exits follow the open position".to_string())
        } else if leg.status().is_terminal() {
            Some(format!("leg is {}", leg.status()))
        } else if quantity >= leg.ordered_quantity() || quantity < leg.filled_quantity() {
            Some(format!(
                "{quantity} is outside {}..{}",
                leg.filled_quantity(),
                leg.ordered_quantity()
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(OrderGroupError::ModificationNotAllowed {
                leg_id: leg_id.clone(),
                reason,
            });
        }
        leg.set_quantity(quantity);

        self.touch();
        let leg = &self.legs[idx];
        self.events.push(GroupEvent::LegModified(LegModified {
            group_id: self.id.clone(),
            leg_id: leg.id().clone(),
            role: leg.role(),
            price: leg.price(),
            trigger_price: leg.trigger_price(),
            quantity,
            occurred_at: self.updated_at,
        }));
        Ok(())
    }

    /// Record a square-off issued for the entry position.
    ///
    /// # Errors
    ///
    /// Returns error if the group is terminal or was already squared off.
    pub fn record_square_off(
        &mut self,
        exchange_order_id: ExchangeOrderId,
        quantity: Quantity,
        reason: CancelReason,
    ) -> Result<(), OrderGroupError> {
        self.ensure_mutable()?;
        if self.square_off.is_some() {
            return Err(OrderGroupError::ModificationNotAllowed {
                leg_id: self
                    .leg_by_role(LegRole::Entry)
                    .map_or_else(|| LegId::new("entry"), |l| l.id().clone()),
                reason: "entry position already squared off".to_string(),
            });
        }

        self.touch();
        self.square_off = Some(SquareOffRecord {
            exchange_order_id: exchange_order_id.clone(),
            quantity,
            reason: reason.clone(),
            issued_at: self.updated_at,
        });
        self.events.push(GroupEvent::SquareOffIssued(SquareOffIssued {
            group_id: self.id.clone(),
            exchange_order_id,
            quantity,
            reason,
            occurred_at: self.updated_at,
        }));
        self.refresh_status();
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Drain accumulated domain events.
    pub fn drain_events(&mut self) -> Vec<GroupEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pending events without draining.
    #[must_use]
    pub fn pending_events(&self) -> &[GroupEvent] {
        &self.events
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn ensure_mutable(&self) -> Result<(), OrderGroupError> {
        if self.status.is_terminal() {
            return Err(OrderGroupError::GroupTerminal {
                group_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn index_of(&self, leg_id: &LegId) -> Result<usize, OrderGroupError> {
        self.legs
            .iter()
            .position(|l| l.id() == leg_id)
            .ok_or_else(|| OrderGroupError::LegNotFound {
                leg_id: leg_id.clone(),
            })
    }

    fn update_for(&self, idx: usize, previous: LegStatus) -> LegUpdate {
        let leg = &self.legs[idx];
        LegUpdate {
            leg_id: leg.id().clone(),
            role: leg.role(),
            previous,
            current: leg.status(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    fn fill_leg(
        &mut self,
        idx: usize,
        quantity: Quantity,
        price: Option<Price>,
    ) -> Result<(), OrderGroupError> {
        let status = self.legs[idx].apply_fill(quantity, price)?;
        let now = Timestamp::now();
        let leg = &self.legs[idx];

        if status == LegStatus::Filled {
            self.events.push(GroupEvent::LegFilled(LegFilled {
                group_id: self.id.clone(),
                leg_id: leg.id().clone(),
                role: leg.role(),
                quantity: leg.filled_quantity(),
                average_price: leg.average_fill_price(),
                occurred_at: now,
            }));
            if let (Some(plan), LegRole::Slice(_)) = (self.iceberg_plan.as_mut(), leg.role()) {
                if !plan.is_halted() {
                    plan.on_slice_filled(leg.id())?;
                }
            }
        } else {
            self.events.push(GroupEvent::LegPartiallyFilled(LegPartiallyFilled {
                group_id: self.id.clone(),
                leg_id: leg.id().clone(),
                role: leg.role(),
                fill_quantity: quantity,
                cumulative_quantity: leg.filled_quantity(),
                fill_price: price,
                occurred_at: now,
            }));
        }
        Ok(())
    }

    fn cancel_at(&mut self, idx: usize, reason: CancelReason) -> Result<(), OrderGroupError> {
        self.legs[idx].cancel(reason.clone())?;
        let leg = &self.legs[idx];
        self.events.push(GroupEvent::LegCancelled(LegCancelled {
            group_id: self.id.clone(),
            leg_id: leg.id().clone(),
            role: leg.role(),
            reason,
            filled_quantity: leg.filled_quantity(),
            occurred_at: Timestamp::now(),
        }));
        self.on_slice_closed(idx)
    }

    fn reject_at(&mut self, idx: usize, reason: RejectReason) -> Result<(), OrderGroupError> {
        self.legs[idx].reject(reason.clone())?;
        let leg = &self.legs[idx];
        self.events.push(GroupEvent::LegRejected(LegRejected {
            group_id: self.id.clone(),
            leg_id: leg.id().clone(),
            role: leg.role(),
            reason,
            occurred_at: Timestamp::now(),
        }));
        self.on_slice_closed(idx)
    }

    /// Halt the iceberg plan when its open slice closes without filling.
    fn on_slice_closed(&mut self, idx: usize) -> Result<(), OrderGroupError> {
        let leg_id = self.legs[idx].id().clone();
        let Some(plan) = self.iceberg_plan.as_mut() else {
            return Ok(());
        };
        let is_open = plan.open_slice().is_some_and(|s| s.leg_id == leg_id);
        if !is_open {
            return Ok(());
        }
        if let SliceDecision::Halt { unreleased } = plan.on_slice_terminated(&leg_id)? {
            self.close_unreleased(&unreleased)?;
        }
        Ok(())
    }

    fn close_unreleased(&mut self, unreleased: &[LegId]) -> Result<(), OrderGroupError> {
        for leg_id in unreleased {
            let idx = self.index_of(leg_id)?;
            if self.legs[idx].status() == LegStatus::Created {
                self.cancel_at(idx, CancelReason::iceberg_halted())?;
            }
        }
        Ok(())
    }

    fn refresh_status(&mut self) {
        let derived = GroupStatusDeriver::derive(self.kind, &self.legs, self.square_off.is_some());
        if derived == self.status {
            return;
        }
        self.status = derived;
        if !derived.is_terminal() {
            return;
        }

        self.close_reason = self.closing_reason(derived);
        let closed = GroupClosed {
            group_id: self.id.clone(),
            filled_quantity: self.filled_quantity(),
            reason: self.close_reason.clone(),
            occurred_at: self.updated_at,
        };
        self.events.push(match derived {
            GroupStatus::Completed => GroupEvent::GroupCompleted(closed),
            GroupStatus::PartiallyDone => GroupEvent::GroupPartiallyDone(closed),
            GroupStatus::Failed => GroupEvent::GroupFailed(closed),
            _ => GroupEvent::GroupCancelled(closed),
        });
    }

    fn closing_reason(&self, status: GroupStatus) -> Option<CancelReason> {
        match status {
            GroupStatus::Completed => None,
            GroupStatus::Failed => self
                .legs
                .iter()
                .find_map(Leg::reject_reason)
                .map(|r| CancelReason::new(r.code.clone(), r.message.clone())),
            _ => {
                if let Some(record) = &self.square_off {
                    return Some(record.reason.clone());
                }
                let reasons: Vec<&CancelReason> =
                    self.legs.iter().filter_map(Leg::cancel_reason).collect();
                reasons
                    .iter()
                    .find(|r| !r.is_cascade())
                    .or_else(|| reasons.last())
                    .map(|r| (*r).clone())
            }
        }
    }
}

// ============================================================================
// Leg construction
// ============================================================================

fn plain_leg(
    role: LegRole,
    instrument: &InstrumentId,
    side: OrderSide,
    quantity: Quantity,
    pricing: OrderPricing,
) -> LegTemplate {
    LegTemplate {
        id: LegId::generate(),
        role,
        depends_on: None,
        instrument: instrument.clone(),
        side,
        order_type: pricing.order_type,
        quantity,
        price: pricing.price,
        trigger_price: None,
        trigger_operator: None,
        trailing_offset: None,
    }
}

fn stop_loss_leg(cmd: &CreateGroupCommand, entry_id: &LegId, spec: &StopLossSpec) -> LegTemplate {
    let exit_side = cmd.side.opposite();
    let mut leg = plain_leg(
        LegRole::StopLoss,
        &cmd.instrument,
        exit_side,
        cmd.quantity,
        OrderPricing::market(),
    );
    leg.depends_on = Some(entry_id.clone());
    leg.trigger_price = Some(spec.trigger_price);

    if let Some(offset) = spec.trailing_offset {
        // Held locally: the engine trails the trigger and sends a plain order on fire.
        leg.trigger_operator = Some(match cmd.side {
            OrderSide::Buy => TriggerOperator::AtOrBelow,
            OrderSide::Sell => TriggerOperator::AtOrAbove,
        });
        leg.trailing_offset = Some(offset);
        if let Some(limit) = spec.limit_price {
            leg.order_type = OrderType::Limit;
            leg.price = Some(limit);
        }
    } else {
        leg.order_type = if spec.limit_price.is_some() {
            OrderType::StopLoss
        } else {
            OrderType::StopLossMarket
        };
        leg.price = spec.limit_price;
    }
    leg
}

fn leg_templates(cmd: &CreateGroupCommand, params: &GroupParams) -> Vec<LegTemplate> {
    match params {
        GroupParams::Bracket {
            entry,
            target_price,
            stop_loss,
        } => {
            let entry_leg = plain_leg(LegRole::Entry, &cmd.instrument, cmd.side, cmd.quantity, *entry);
            let mut target = plain_leg(
                LegRole::Target,
                &cmd.instrument,
                cmd.side.opposite(),
                cmd.quantity,
                OrderPricing::limit(*target_price),
            );
            target.depends_on = Some(entry_leg.id.clone());
            let sl = stop_loss_leg(cmd, &entry_leg.id, stop_loss);
            vec![entry_leg, target, sl]
        }
        GroupParams::Cover { entry, stop_loss } => {
            let entry_leg = plain_leg(LegRole::Entry, &cmd.instrument, cmd.side, cmd.quantity, *entry);
            let sl = stop_loss_leg(cmd, &entry_leg.id, stop_loss);
            vec![entry_leg, sl]
        }
        GroupParams::Spread { near, far } => vec![
            plain_leg(LegRole::Near, &cmd.instrument, cmd.side, cmd.quantity, *near),
            plain_leg(LegRole::Far, &far.instrument, far.side, cmd.quantity, far.pricing),
        ],
        GroupParams::Gtt { trigger, pricing } => {
            let mut leg = plain_leg(LegRole::Entry, &cmd.instrument, cmd.side, cmd.quantity, *pricing);
            leg.trigger_operator = Some(trigger.operator);
            leg.trigger_price = Some(trigger.trigger_price);
            leg.trailing_offset = trigger.trailing_offset;
            vec![leg]
        }
        GroupParams::GttOco { upper, lower } => {
            let mut a = plain_leg(LegRole::OcoA, &cmd.instrument, cmd.side, cmd.quantity, upper.pricing);
            a.trigger_operator = Some(TriggerOperator::AtOrAbove);
            a.trigger_price = Some(upper.trigger_price);
            let mut b = plain_leg(LegRole::OcoB, &cmd.instrument, cmd.side, cmd.quantity, lower.pricing);
            b.trigger_operator = Some(TriggerOperator::AtOrBelow);
            b.trigger_price = Some(lower.trigger_price);
            vec![a, b]
        }
        // Built from the plan in `OrderGroup::new`.
        GroupParams::Iceberg { .. } => Vec::new(),
    }
}
