//! Leg entity: one child order inside an order group.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::order_group::services::LegStateMachine;
use crate::domain::order_group::value_objects::{
    CancelReason, LegRole, LegStatus, OrderSide, OrderType, RejectReason,
};
use crate::domain::shared::{ExchangeOrderId, GroupId, InstrumentId, LegId, Price, Quantity, Timestamp};
use crate::domain::triggers::{TriggerCondition, TriggerOperator};

/// Everything needed to create a leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegTemplate {
    /// Leg id (generated for most legs, pre-allocated for iceberg slices).
    pub id: LegId,
    /// Role.
    pub role: LegRole,
    /// Leg this one waits on.
    pub depends_on: Option<LegId>,
    /// Instrument.
    pub instrument: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Order type sent to the exchange.
    pub order_type: OrderType,
    /// Ordered quantity.
    pub quantity: Quantity,
    /// Limit price.
    pub price: Option<Price>,
    /// Trigger price (exchange stop or local trigger).
    pub trigger_price: Option<Price>,
    /// Set when the engine holds the leg until a local trigger fires.
    pub trigger_operator: Option<TriggerOperator>,
    /// Trailing distance for a local trigger.
    pub trailing_offset: Option<Decimal>,
}

/// A child order of an order group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    id: LegId,
    group_id: GroupId,
    role: LegRole,
    depends_on: Option<LegId>,
    instrument: InstrumentId,
    side: OrderSide,
    order_type: OrderType,
    ordered_quantity: Quantity,
    filled_quantity: Quantity,
    price: Option<Price>,
    trigger_price: Option<Price>,
    trigger_operator: Option<TriggerOperator>,
    trailing_offset: Option<Decimal>,
    exchange_order_id: Option<ExchangeOrderId>,
    status: LegStatus,
    average_fill_price: Option<Price>,
    cancel_reason: Option<CancelReason>,
    reject_reason: Option<RejectReason>,
    updated_at: Timestamp,
}

impl Leg {
    /// Create a leg in `Created` status.
    #[must_use]
    pub fn new(group_id: GroupId, template: LegTemplate) -> Self {
        Self {
            id: template.id,
            group_id,
            role: template.role,
            depends_on: template.depends_on,
            instrument: template.instrument,
            side: template.side,
            order_type: template.order_type,
            ordered_quantity: template.quantity,
            filled_quantity: Quantity::ZERO,
            price: template.price,
            trigger_price: template.trigger_price,
            trigger_operator: template.trigger_operator,
            trailing_offset: template.trailing_offset,
            exchange_order_id: None,
            status: LegStatus::Created,
            average_fill_price: None,
            cancel_reason: None,
            reject_reason: None,
            updated_at: Timestamp::now(),
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Leg id.
    #[must_use]
    pub const fn id(&self) -> &LegId {
        &self.id
    }

    /// Owning group.
    #[must_use]
    pub const fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    /// Role inside the group.
    #[must_use]
    pub const fn role(&self) -> LegRole {
        self.role
    }

    /// Leg this one depends on.
    #[must_use]
    pub const fn depends_on(&self) -> Option<&LegId> {
        self.depends_on.as_ref()
    }

    /// Instrument.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Ordered quantity.
    #[must_use]
    pub const fn ordered_quantity(&self) -> Quantity {
        self.ordered_quantity
    }

    /// Filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    /// Unfilled quantity.
    #[must_use]
    pub fn remaining_quantity(&self) -> Quantity {
        self.ordered_quantity.saturating_sub(self.filled_quantity)
    }

    /// Limit price.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        self.price
    }

    /// Trigger price.
    #[must_use]
    pub const fn trigger_price(&self) -> Option<Price> {
        self.trigger_price
    }

    /// Local trigger operator, if the engine holds this leg.
    #[must_use]
    pub const fn trigger_operator(&self) -> Option<TriggerOperator> {
        self.trigger_operator
    }

    /// Trailing distance.
    #[must_use]
    pub const fn trailing_offset(&self) -> Option<Decimal> {
        self.trailing_offset
    }

    /// Returns true if the leg trails the market.
    #[must_use]
    pub const fn is_trailing(&self) -> bool {
        self.trailing_offset.is_some()
    }

    /// Returns true if the leg is released by a local trigger rather than
    /// sent to the exchange directly.
    #[must_use]
    pub const fn is_trigger_held(&self) -> bool {
        self.trigger_operator.is_some()
    }

    /// Exchange order id, once submitted.
    #[must_use]
    pub const fn exchange_order_id(&self) -> Option<&ExchangeOrderId> {
        self.exchange_order_id.as_ref()
    }

    /// Status.
    #[must_use]
    pub const fn status(&self) -> LegStatus {
        self.status
    }

    /// Volume-weighted average fill price.
    #[must_use]
    pub const fn average_fill_price(&self) -> Option<Price> {
        self.average_fill_price
    }

    /// Why the leg was cancelled.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        self.cancel_reason.as_ref()
    }

    /// Why the leg was rejected.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<&RejectReason> {
        self.reject_reason.as_ref()
    }

    /// Last update.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Build the trigger condition to arm for this leg.
    ///
    /// Returns `None` for legs that are not trigger-held.
    #[must_use]
    pub fn trigger_condition(&self, oco_sibling: Option<LegId>) -> Option<TriggerCondition> {
        let operator = self.trigger_operator?;
        let trigger_price = self.trigger_price?;
        let mut condition = TriggerCondition::fixed(
            self.id.clone(),
            self.group_id.clone(),
            self.instrument.clone(),
            operator,
            trigger_price,
        );
        if let Some(offset) = self.trailing_offset {
            condition = condition.with_trailing_offset(offset);
        }
        if let Some(sibling) = oco_sibling {
            condition = condition.with_oco_sibling(sibling);
        }
        Some(condition)
    }

    // ========================================================================
    // State Transitions (driven by the OrderGroup aggregate)
    // ========================================================================

    pub(crate) fn mark_triggered(&mut self) -> Result<(), OrderGroupError> {
        self.transition(LegStatus::Triggered)
    }

    pub(crate) fn mark_submitted(
        &mut self,
        exchange_order_id: ExchangeOrderId,
    ) -> Result<(), OrderGroupError> {
        self.transition(LegStatus::Submitted)?;
        self.exchange_order_id = Some(exchange_order_id);
        Ok(())
    }

    /// Apply a fill of `quantity`; returns the new status.
    pub(crate) fn apply_fill(
        &mut self,
        quantity: Quantity,
        price: Option<Price>,
    ) -> Result<LegStatus, OrderGroupError> {
        let remaining = self.remaining_quantity();
        if quantity > remaining || !quantity.is_positive() {
            return Err(OrderGroupError::FillExceedsOrdered {
                leg_id: self.id.clone(),
                fill_qty: quantity.to_string(),
                remaining_qty: remaining.to_string(),
            });
        }

        let target = if quantity == remaining {
            LegStatus::Filled
        } else {
            LegStatus::PartiallyFilled
        };
        self.transition(target)?;

        let fill_price = price.or(self.price);
        if let Some(fill_price) = fill_price {
            let new_filled = self.filled_quantity + quantity;
            let old_value = self
                .average_fill_price
                .map_or(Decimal::ZERO, |p| p.amount() * self.filled_quantity.amount());
            let avg = (old_value + fill_price.amount() * quantity.amount()) / new_filled.amount();
            self.average_fill_price = Some(Price::new(avg));
        }
        self.filled_quantity += quantity;
        Ok(target)
    }

    /// Fill whatever is left.
    pub(crate) fn fill_remaining(&mut self, price: Option<Price>) -> Result<Quantity, OrderGroupError> {
        let remaining = self.remaining_quantity();
        self.apply_fill(remaining, price)?;
        Ok(remaining)
    }

    pub(crate) fn cancel(&mut self, reason: CancelReason) -> Result<(), OrderGroupError> {
        self.transition(LegStatus::Cancelled)?;
        self.cancel_reason = Some(reason);
        Ok(())
    }

    pub(crate) fn reject(&mut self, reason: RejectReason) -> Result<(), OrderGroupError> {
        self.transition(LegStatus::Rejected)?;
        self.reject_reason = Some(reason);
        Ok(())
    }

    pub(crate) fn set_trigger_price(&mut self, price: Price) {
        self.trigger_price = Some(price);
        self.updated_at = Timestamp::now();
    }

    pub(crate) fn set_price(&mut self, price: Price) {
        self.price = Some(price);
        self.updated_at = Timestamp::now();
    }

    pub(crate) fn set_trailing_offset(&mut self, offset: Decimal) {
        self.trailing_offset = Some(offset);
        self.updated_at = Timestamp::now();
    }

    pub(crate) fn set_quantity(&mut self, quantity: Quantity) {
        self.ordered_quantity = quantity;
        self.updated_at = Timestamp::now();
    }

    fn transition(&mut self, to: LegStatus) -> Result<(), OrderGroupError> {
        LegStateMachine::validate_transition(&self.id, self.status, to)?;
        self.status = to;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(quantity: i64) -> Leg {
        Leg::new(
            GroupId::new("grp-1"),
            LegTemplate {
                id: LegId::new("leg-1"),
                role: LegRole::Entry,
                depends_on: None,
                instrument: InstrumentId::new("INFY"),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                quantity: Quantity::from_i64(quantity),
                price: Some(Price::from_i64(100)),
                trigger_price: None,
                trigger_operator: None,
                trailing_offset: None,
            },
        )
    }

    #[test]
    fn new_leg_is_created_and_unfilled() {
        let leg = leg(10);
        assert_eq!(leg.status(), LegStatus::Created);
        assert_eq!(leg.filled_quantity(), Quantity::ZERO);
        assert!(leg.exchange_order_id().is_none());
        assert!(!leg.is_trigger_held());
    }

    #[test]
    fn partial_then_full_fill_tracks_average_price() {
        let mut leg = leg(10);
        leg.mark_submitted(ExchangeOrderId::new("EX-1")).unwrap();

        let status = leg
            .apply_fill(Quantity::from_i64(4), Some(Price::from_i64(100)))
            .unwrap();
        assert_eq!(status, LegStatus::PartiallyFilled);

        let status = leg
            .apply_fill(Quantity::from_i64(6), Some(Price::from_i64(110)))
            .unwrap();
        assert_eq!(status, LegStatus::Filled);
        assert_eq!(leg.filled_quantity(), Quantity::from_i64(10));
        assert_eq!(leg.average_fill_price(), Some(Price::from_i64(106)));
    }

    #[test]
    fn overfill_is_rejected() {
        let mut leg = leg(5);
        leg.mark_submitted(ExchangeOrderId::new("EX-1")).unwrap();
        let err = leg.apply_fill(Quantity::from_i64(6), None).unwrap_err();
        assert!(matches!(err, OrderGroupError::FillExceedsOrdered { .. }));
        assert_eq!(leg.filled_quantity(), Quantity::ZERO);
    }

    #[test]
    fn fill_before_submission_is_invalid() {
        let mut leg = leg(5);
        let err = leg.apply_fill(Quantity::from_i64(5), None).unwrap_err();
        assert!(matches!(err, OrderGroupError::InvalidStateTransition { .. }));
    }

    #[test]
    fn cancel_after_fill_is_invalid() {
        let mut leg = leg(5);
        leg.mark_submitted(ExchangeOrderId::new("EX-1")).unwrap();
        leg.fill_remaining(None).unwrap();
        assert!(leg.cancel(CancelReason::user_requested()).is_err());
        assert_eq!(leg.status(), LegStatus::Filled);
    }

    #[test]
    fn trigger_condition_carries_trailing_and_sibling() {
        let mut template_leg = leg(5);
        template_leg.trigger_operator = Some(TriggerOperator::AtOrBelow);
        template_leg.trigger_price = Some(Price::from_i64(95));
        template_leg.trailing_offset = Some(Decimal::TWO);

        let condition = template_leg
            .trigger_condition(Some(LegId::new("leg-target")))
            .unwrap();
        assert!(condition.is_trailing());
        assert_eq!(condition.oco_sibling, Some(LegId::new("leg-target")));
        assert_eq!(condition.trigger_price, Price::from_i64(95));
    }
}
