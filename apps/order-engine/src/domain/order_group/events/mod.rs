//! Domain events for order groups.
//!
//! Every leg transition and every automatic cascade produces an event; the
//! store appends them to the group's history and the publisher forwards them
//! downstream.

use serde::{Deserialize, Serialize};

use super::value_objects::{CancelReason, GroupKind, LegRole, RejectReason};
use crate::domain::shared::{
    ClientId, ExchangeOrderId, GroupId, InstrumentId, LegId, Price, Quantity, Timestamp,
};

/// All order group events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupEvent {
    /// Group and its legs created.
    GroupCreated(GroupCreated),
    /// Leg acknowledged by the execution adapter.
    LegSubmitted(LegSubmitted),
    /// Leg's local trigger fired.
    LegTriggered(LegTriggered),
    /// Trailing trigger moved.
    TriggerAdjusted(TriggerAdjusted),
    /// Leg partially filled.
    LegPartiallyFilled(LegPartiallyFilled),
    /// Leg completely filled.
    LegFilled(LegFilled),
    /// Leg cancelled.
    LegCancelled(LegCancelled),
    /// Leg rejected.
    LegRejected(LegRejected),
    /// Leg price, trigger or quantity changed.
    LegModified(LegModified),
    /// Square-off order issued for the entry position.
    SquareOffIssued(SquareOffIssued),
    /// Group finished with its target outcome.
    GroupCompleted(GroupClosed),
    /// Group closed with part of its quantity filled.
    GroupPartiallyDone(GroupClosed),
    /// Group cancelled.
    GroupCancelled(GroupClosed),
    /// Group failed.
    GroupFailed(GroupClosed),
}

impl GroupEvent {
    /// Group this event belongs to.
    #[must_use]
    pub fn group_id(&self) -> &GroupId {
        match self {
            Self::GroupCreated(e) => &e.group_id,
            Self::LegSubmitted(e) => &e.group_id,
            Self::LegTriggered(e) => &e.group_id,
            Self::TriggerAdjusted(e) => &e.group_id,
            Self::LegPartiallyFilled(e) => &e.group_id,
            Self::LegFilled(e) => &e.group_id,
            Self::LegCancelled(e) => &e.group_id,
            Self::LegRejected(e) => &e.group_id,
            Self::LegModified(e) => &e.group_id,
            Self::SquareOffIssued(e) => &e.group_id,
            Self::GroupCompleted(e)
            | Self::GroupPartiallyDone(e)
            | Self::GroupCancelled(e)
            | Self::GroupFailed(e) => &e.group_id,
        }
    }

    /// When the event occurred.
    #[must_use]
    pub fn occurred_at(&self) -> Timestamp {
        match self {
            Self::GroupCreated(e) => e.occurred_at,
            Self::LegSubmitted(e) => e.occurred_at,
            Self::LegTriggered(e) => e.occurred_at,
            Self::TriggerAdjusted(e) => e.occurred_at,
            Self::LegPartiallyFilled(e) => e.occurred_at,
            Self::LegFilled(e) => e.occurred_at,
            Self::LegCancelled(e) => e.occurred_at,
            Self::LegRejected(e) => e.occurred_at,
            Self::LegModified(e) => e.occurred_at,
            Self::SquareOffIssued(e) => e.occurred_at,
            Self::GroupCompleted(e)
            | Self::GroupPartiallyDone(e)
            | Self::GroupCancelled(e)
            | Self::GroupFailed(e) => e.occurred_at,
        }
    }

    /// Event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::GroupCreated(_) => "GROUP_CREATED",
            Self::LegSubmitted(_) => "LEG_SUBMITTED",
            Self::LegTriggered(_) => "LEG_TRIGGERED",
            Self::TriggerAdjusted(_) => "TRIGGER_ADJUSTED",
            Self::LegPartiallyFilled(_) => "LEG_PARTIALLY_FILLED",
            Self::LegFilled(_) => "LEG_FILLED",
            Self::LegCancelled(_) => "LEG_CANCELLED",
            Self::LegRejected(_) => "LEG_REJECTED",
            Self::LegModified(_) => "LEG_MODIFIED",
            Self::SquareOffIssued(_) => "SQUARE_OFF_ISSUED",
            Self::GroupCompleted(_) => "GROUP_COMPLETED",
            Self::GroupPartiallyDone(_) => "GROUP_PARTIALLY_DONE",
            Self::GroupCancelled(_) => "GROUP_CANCELLED",
            Self::GroupFailed(_) => "GROUP_FAILED",
        }
    }

    /// Reason code carried by the event, if any.
    #[must_use]
    pub fn reason_code(&self) -> Option<&str> {
        match self {
            Self::LegCancelled(e) => Some(&e.reason.code),
            Self::LegRejected(e) => Some(&e.reason.code),
            Self::SquareOffIssued(e) => Some(&e.reason.code),
            Self::GroupCompleted(e)
            | Self::GroupPartiallyDone(e)
            | Self::GroupCancelled(e)
            | Self::GroupFailed(e) => e.reason.as_ref().map(|r| r.code.as_str()),
            _ => None,
        }
    }

    /// Returns true if this event closes the group.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GroupCompleted(_)
                | Self::GroupPartiallyDone(_)
                | Self::GroupCancelled(_)
                | Self::GroupFailed(_)
        )
    }
}

/// Group created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreated {
    /// Group.
    pub group_id: GroupId,
    /// Client.
    pub client_id: ClientId,
    /// Kind.
    pub kind: GroupKind,
    /// Instrument.
    pub instrument: InstrumentId,
    /// Total quantity.
    pub quantity: Quantity,
    /// Number of legs created.
    pub leg_count: usize,
    /// When.
    pub occurred_at: Timestamp,
}

/// Leg submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSubmitted {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Exchange order id.
    pub exchange_order_id: ExchangeOrderId,
    /// Quantity sent.
    pub quantity: Quantity,
    /// When.
    pub occurred_at: Timestamp,
}

/// Local trigger fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegTriggered {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Trigger price at fire time.
    pub trigger_price: Price,
    /// LTP that fired it.
    pub ltp: Price,
    /// When.
    pub occurred_at: Timestamp,
}

/// Trailing trigger moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAdjusted {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Old trigger.
    pub previous: Price,
    /// New trigger.
    pub current: Price,
    /// When.
    pub occurred_at: Timestamp,
}

/// Partial fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegPartiallyFilled {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// This fill.
    pub fill_quantity: Quantity,
    /// Cumulative filled.
    pub cumulative_quantity: Quantity,
    /// Fill price.
    pub fill_price: Option<Price>,
    /// When.
    pub occurred_at: Timestamp,
}

/// Complete fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegFilled {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Total filled.
    pub quantity: Quantity,
    /// Average price.
    pub average_price: Option<Price>,
    /// When.
    pub occurred_at: Timestamp,
}

/// Leg cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegCancelled {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Reason.
    pub reason: CancelReason,
    /// Quantity filled before the cancel.
    pub filled_quantity: Quantity,
    /// When.
    pub occurred_at: Timestamp,
}

/// Leg rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRejected {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Reason.
    pub reason: RejectReason,
    /// When.
    pub occurred_at: Timestamp,
}

/// Leg modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegModified {
    /// Group.
    pub group_id: GroupId,
    /// Leg.
    pub leg_id: LegId,
    /// Role.
    pub role: LegRole,
    /// Price after the change.
    pub price: Option<Price>,
    /// Trigger after the change.
    pub trigger_price: Option<Price>,
    /// Quantity after the change.
    pub quantity: Quantity,
    /// When.
    pub occurred_at: Timestamp,
}

/// Square-off issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareOffIssued {
    /// Group.
    pub group_id: GroupId,
    /// Square-off order at the exchange.
    pub exchange_order_id: ExchangeOrderId,
    /// Quantity squared off.
    pub quantity: Quantity,
    /// Reason.
    pub reason: CancelReason,
    /// When.
    pub occurred_at: Timestamp,
}

/// Group reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupClosed {
    /// Group.
    pub group_id: GroupId,
    /// Quantity filled across opening legs.
    pub filled_quantity: Quantity,
    /// Reason the group closed, absent on plain completion.
    pub reason: Option<CancelReason>,
    /// When.
    pub occurred_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_event_exposes_reason_code() {
        let event = GroupEvent::LegCancelled(LegCancelled {
            group_id: GroupId::new("grp-1"),
            leg_id: LegId::new("leg-sl"),
            role: LegRole::StopLoss,
            reason: CancelReason::cascade_cancel_sibling(),
            filled_quantity: Quantity::ZERO,
            occurred_at: Timestamp::now(),
        });
        assert_eq!(event.event_type(), "LEG_CANCELLED");
        assert_eq!(event.reason_code(), Some("CASCADE_CANCEL_SIBLING"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = GroupEvent::GroupCancelled(GroupClosed {
            group_id: GroupId::new("grp-1"),
            filled_quantity: Quantity::from_i64(10),
            reason: Some(CancelReason::cascade_squareoff_entry()),
            occurred_at: Timestamp::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "GROUP_CANCELLED");
        assert_eq!(json["reason"]["code"], "CASCADE_SQUAREOFF_ENTRY");
        assert!(event.is_terminal());
    }
}
