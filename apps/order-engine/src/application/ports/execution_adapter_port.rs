//! Execution Adapter Port (Driven Port)
//!
//! Interface to the component that places child orders at the exchange and
//! reports what happened to them. Synchronous calls return acknowledgements;
//! fills, rejects and cancel confirmations arrive later as `ExecutionReport`s
//! on the adapter's event stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::order_group::{Leg, OrderGroup, OrderSide, OrderType, ProductType};
use crate::domain::shared::{
    ClientId, Exchange, ExchangeOrderId, GroupId, InstrumentId, LegId, Price, Quantity,
};

/// Request to place one leg at the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegOrderRequest {
    /// Group the leg belongs to.
    pub group_id: GroupId,
    /// Leg id, echoed by the adapter as the client order reference.
    pub leg_id: LegId,
    /// Account.
    pub client_id: ClientId,
    /// Instrument.
    pub instrument: InstrumentId,
    /// Exchange segment.
    pub exchange: Exchange,
    /// Product.
    pub product: ProductType,
    /// Side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Quantity,
    /// Limit price.
    pub price: Option<Price>,
    /// Exchange stop trigger.
    pub trigger_price: Option<Price>,
}

impl LegOrderRequest {
    /// Build the request for `leg` of `group`.
    #[must_use]
    pub fn for_leg(group: &OrderGroup, leg: &Leg) -> Self {
        Self {
            group_id: group.id().clone(),
            leg_id: leg.id().clone(),
            client_id: group.client_id().clone(),
            instrument: leg.instrument().clone(),
            exchange: group.exchange(),
            product: group.product(),
            side: leg.side(),
            order_type: leg.order_type(),
            quantity: leg.remaining_quantity(),
            price: leg.price(),
            trigger_price: leg
                .order_type()
                .requires_trigger()
                .then(|| leg.trigger_price())
                .flatten(),
        }
    }
}

/// Request to change a working order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    /// Working order.
    pub exchange_order_id: ExchangeOrderId,
    /// New limit price.
    pub price: Option<Price>,
    /// New stop trigger.
    pub trigger_price: Option<Price>,
    /// New quantity.
    pub quantity: Option<Quantity>,
}

impl ModifyOrderRequest {
    /// Empty modification of `exchange_order_id`.
    #[must_use]
    pub const fn new(exchange_order_id: ExchangeOrderId) -> Self {
        Self {
            exchange_order_id,
            price: None,
            trigger_price: None,
            quantity: None,
        }
    }

    /// Set the limit price.
    #[must_use]
    pub const fn with_price(mut self, price: Option<Price>) -> Self {
        self.price = price;
        self
    }

    /// Set the stop trigger.
    #[must_use]
    pub const fn with_trigger_price(mut self, trigger_price: Option<Price>) -> Self {
        self.trigger_price = trigger_price;
        self
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: Option<Quantity>) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Request to flatten an entry position with a market order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareOffRequest {
    /// Group whose position is closed.
    pub group_id: GroupId,
    /// Account.
    pub client_id: ClientId,
    /// Instrument.
    pub instrument: InstrumentId,
    /// Exchange segment.
    pub exchange: Exchange,
    /// Product.
    pub product: ProductType,
    /// Closing side (opposite of the entry).
    pub side: OrderSide,
    /// Quantity to close.
    pub quantity: Quantity,
}

impl SquareOffRequest {
    /// Square off `quantity` of `group`'s entry position.
    #[must_use]
    pub fn for_group(group: &OrderGroup, quantity: Quantity) -> Self {
        Self {
            group_id: group.id().clone(),
            client_id: group.client_id().clone(),
            instrument: group.instrument().clone(),
            exchange: group.exchange(),
            product: group.product(),
            side: group.side().opposite(),
            quantity,
        }
    }
}

/// An order the adapter reports as working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    /// Exchange order id.
    pub exchange_order_id: ExchangeOrderId,
    /// Instrument.
    pub instrument: InstrumentId,
    /// Quantity still working.
    pub pending_quantity: Quantity,
}

/// How an adapter failure should be handled by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient failure, retry with backoff.
    Retryable,
    /// Business outcome, never retried.
    NonRetryable,
    /// Throttled, retry with backoff.
    RateLimited,
}

/// Execution adapter error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// Order rejected by the exchange or the adapter's risk checks.
    #[error("Order rejected: {reason}")]
    Rejected {
        /// Rejection reason.
        reason: String,
    },

    /// Cancel arrived after the order filled.
    #[error("Too late to cancel: order {exchange_order_id} already filled")]
    TooLateToCancel {
        /// Filled order.
        exchange_order_id: ExchangeOrderId,
    },

    /// Order unknown to the adapter.
    #[error("Order not found: {exchange_order_id}")]
    OrderNotFound {
        /// The missing order.
        exchange_order_id: ExchangeOrderId,
    },

    /// Connection error.
    #[error("Adapter connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Request timed out.
    #[error("Adapter request timed out: {message}")]
    Timeout {
        /// Error details.
        message: String,
    },

    /// Rate limited.
    #[error("Rate limited by adapter")]
    RateLimited,
}

impl AdapterError {
    /// Classify the error for the retry loop.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ConnectionError { .. } | Self::Timeout { .. } => ErrorCategory::Retryable,
            Self::RateLimited => ErrorCategory::RateLimited,
            Self::Rejected { .. } | Self::TooLateToCancel { .. } | Self::OrderNotFound { .. } => {
                ErrorCategory::NonRetryable
            }
        }
    }

    /// Returns true if a retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self.category(), ErrorCategory::NonRetryable)
    }
}

/// Port for placing and managing leg orders.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Place a leg. Returns the exchange order id.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` for business rejects, transient variants otherwise.
    async fn submit_leg(&self, request: LegOrderRequest) -> Result<ExchangeOrderId, AdapterError>;

    /// Cancel a working order. The confirmation also arrives as a
    /// `CancelledAck` report.
    ///
    /// # Errors
    ///
    /// Returns `TooLateToCancel` if the order already filled.
    async fn cancel_leg(&self, exchange_order_id: &ExchangeOrderId) -> Result<(), AdapterError>;

    /// Change price, trigger or quantity of a working order.
    ///
    /// # Errors
    ///
    /// Returns error if the order is unknown or the change is refused.
    async fn modify_leg(&self, request: ModifyOrderRequest) -> Result<(), AdapterError>;

    /// Flatten a position with a market order. Returns its exchange order id.
    ///
    /// # Errors
    ///
    /// Returns error if the order could not be placed.
    async fn square_off(&self, request: SquareOffRequest) -> Result<ExchangeOrderId, AdapterError>;

    /// Orders the adapter still considers working.
    ///
    /// # Errors
    ///
    /// Returns error if the adapter cannot be queried.
    async fn open_orders(&self) -> Result<Vec<OpenOrder>, AdapterError>;

    /// Check that the adapter is reachable.
    ///
    /// # Errors
    ///
    /// Returns error if the adapter is unavailable.
    async fn health_check(&self) -> Result<(), AdapterError>;
}
