//! Execution reports delivered by the execution adapter's event stream.

use serde::{Deserialize, Serialize};

use super::RejectReason;
use crate::domain::shared::{EventId, ExchangeOrderId, Price, Quantity, Timestamp};

/// What happened to an exchange order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionKind {
    /// The remaining quantity filled.
    Filled {
        /// Fill price, when reported.
        price: Option<Price>,
    },
    /// An incremental partial fill.
    PartialFill {
        /// Quantity filled by this execution.
        quantity: Quantity,
        /// Fill price, when reported.
        price: Option<Price>,
    },
    /// The order was rejected.
    Rejected {
        /// Why it was rejected.
        reason: RejectReason,
    },
    /// The order was cancelled at the exchange.
    CancelledAck,
}

impl ExecutionKind {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Filled { .. } => "filled",
            Self::PartialFill { .. } => "partial_fill",
            Self::Rejected { .. } => "rejected",
            Self::CancelledAck => "cancelled_ack",
        }
    }
}

/// One event from the execution adapter's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Idempotency id; unique per exchange order.
    pub event_id: EventId,
    /// Exchange order the event refers to.
    pub exchange_order_id: ExchangeOrderId,
    /// Event payload.
    pub kind: ExecutionKind,
    /// When the adapter observed the event.
    pub occurred_at: Timestamp,
}

impl ExecutionReport {
    /// Create a report stamped with the current time.
    #[must_use]
    pub fn new(
        event_id: impl Into<EventId>,
        exchange_order_id: impl Into<ExchangeOrderId>,
        kind: ExecutionKind,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            exchange_order_id: exchange_order_id.into(),
            kind,
            occurred_at: Timestamp::now(),
        }
    }

    /// Key under which the report is deduplicated.
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.exchange_order_id, self.event_id)
    }
}
