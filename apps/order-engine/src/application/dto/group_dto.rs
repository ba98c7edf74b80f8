//! Group DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_group::{
    GroupEvent, GroupKind, GroupStatus, Leg, LegRole, LegStatus, OrderGroup, OrderSide,
    OrderType, StoredEvent,
};
use crate::domain::shared::{GroupId, Timestamp};

/// DTO representing one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSnapshotDto {
    /// Leg id.
    pub leg_id: String,
    /// Role.
    pub role: LegRole,
    /// Status.
    pub status: LegStatus,
    /// Instrument.
    pub instrument: String,
    /// Side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Filled quantity.
    pub filled_quantity: Decimal,
    /// Limit price.
    pub price: Option<Decimal>,
    /// Current trigger price.
    pub trigger_price: Option<Decimal>,
    /// Trailing distance.
    pub trailing_offset: Option<Decimal>,
    /// Average fill price.
    pub average_fill_price: Option<Decimal>,
    /// Exchange order id.
    pub exchange_order_id: Option<String>,
    /// Cancel or reject reason code.
    pub reason_code: Option<String>,
    /// Last change.
    pub updated_at: Timestamp,
}

impl LegSnapshotDto {
    /// Create from a domain leg.
    #[must_use]
    pub fn from_leg(leg: &Leg) -> Self {
        let reason_code = leg
            .cancel_reason()
            .map(|r| r.code.clone())
            .or_else(|| leg.reject_reason().map(|r| r.code.clone()));
        Self {
            leg_id: leg.id().to_string(),
            role: leg.role(),
            status: leg.status(),
            instrument: leg.instrument().to_string(),
            side: leg.side(),
            order_type: leg.order_type(),
            quantity: leg.ordered_quantity().amount(),
            filled_quantity: leg.filled_quantity().amount(),
            price: leg.price().map(|p| p.amount()),
            trigger_price: leg.trigger_price().map(|p| p.amount()),
            trailing_offset: leg.trailing_offset(),
            average_fill_price: leg.average_fill_price().map(|p| p.amount()),
            exchange_order_id: leg.exchange_order_id().map(ToString::to_string),
            reason_code,
            updated_at: leg.updated_at(),
        }
    }
}

/// Iceberg slicing progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebergProgressDto {
    /// Disclosed quantity per slice.
    pub disclose_quantity: Decimal,
    /// Quantity not yet released.
    pub remaining_quantity: Decimal,
    /// Slices released so far.
    pub released_slices: usize,
    /// Planned slices.
    pub total_slices: usize,
    /// Slicing stopped early.
    pub halted: bool,
}

/// Square-off issued for the entry position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareOffDto {
    /// Exchange order id.
    pub exchange_order_id: String,
    /// Quantity flattened.
    pub quantity: Decimal,
    /// Reason code.
    pub reason_code: String,
}

/// Point-in-time view of a group and its legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshotDto {
    /// Group id.
    pub group_id: String,
    /// Client.
    pub client_id: String,
    /// Kind.
    pub kind: GroupKind,
    /// Status.
    pub status: GroupStatus,
    /// Instrument.
    pub instrument: String,
    /// Side of the opening leg(s).
    pub side: OrderSide,
    /// Total quantity.
    pub total_quantity: Decimal,
    /// Filled quantity across opening legs.
    pub filled_quantity: Decimal,
    /// Legs in creation order.
    pub legs: Vec<LegSnapshotDto>,
    /// Iceberg progress.
    pub iceberg: Option<IcebergProgressDto>,
    /// Square-off, if one was issued.
    pub square_off: Option<SquareOffDto>,
    /// Reason code of the terminal status.
    pub close_reason: Option<String>,
    /// Expiry.
    pub expires_at: Option<Timestamp>,
    /// Created at.
    pub created_at: Timestamp,
    /// Updated at.
    pub updated_at: Timestamp,
}

impl GroupSnapshotDto {
    /// Create from the domain aggregate.
    #[must_use]
    pub fn from_group(group: &OrderGroup) -> Self {
        Self {
            group_id: group.id().to_string(),
            client_id: group.client_id().to_string(),
            kind: group.kind(),
            status: group.status(),
            instrument: group.instrument().to_string(),
            side: group.side(),
            total_quantity: group.total_quantity().amount(),
            filled_quantity: group.filled_quantity().amount(),
            legs: group.legs().iter().map(LegSnapshotDto::from_leg).collect(),
            iceberg: group.iceberg_plan().map(|plan| IcebergProgressDto {
                disclose_quantity: plan.disclose_quantity().amount(),
                remaining_quantity: plan.remaining_quantity().amount(),
                released_slices: plan.released_count(),
                total_slices: plan.slices().len(),
                halted: plan.is_halted(),
            }),
            square_off: group.square_off().map(|record| SquareOffDto {
                exchange_order_id: record.exchange_order_id.to_string(),
                quantity: record.quantity.amount(),
                reason_code: record.reason.code.clone(),
            }),
            close_reason: group.close_reason().map(|r| r.code.clone()),
            expires_at: group.expires_at(),
            created_at: group.created_at(),
            updated_at: group.updated_at(),
        }
    }

    /// Leg with `role`.
    #[must_use]
    pub fn leg(&self, role: LegRole) -> Option<&LegSnapshotDto> {
        self.legs.iter().find(|l| l.role == role)
    }
}

/// One entry of a group's event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryDto {
    /// Position in the log.
    pub sequence: u64,
    /// Event type, e.g. `LEG_CANCELLED`.
    pub event_type: String,
    /// Reason code for cancels, rejects and square-offs.
    pub reason_code: Option<String>,
    /// Full event.
    pub event: GroupEvent,
    /// When it happened.
    pub occurred_at: Timestamp,
}

/// A group's event history in append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHistoryDto {
    /// Group id.
    pub group_id: String,
    /// Entries.
    pub entries: Vec<HistoryEntryDto>,
}

impl GroupHistoryDto {
    /// Create from the stored log.
    #[must_use]
    pub fn from_log(group_id: &GroupId, log: &[StoredEvent]) -> Self {
        Self {
            group_id: group_id.to_string(),
            entries: log
                .iter()
                .map(|stored| HistoryEntryDto {
                    sequence: stored.sequence,
                    event_type: stored.event.event_type().to_string(),
                    reason_code: stored.event.reason_code().map(str::to_string),
                    event: stored.event.clone(),
                    occurred_at: stored.event.occurred_at(),
                })
                .collect(),
        }
    }

    /// Reason codes recorded in the history, in order.
    #[must_use]
    pub fn reason_codes(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| e.reason_code.as_deref())
            .collect()
    }
}
