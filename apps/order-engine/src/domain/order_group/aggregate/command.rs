//! Intake command for creating an order group.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::order_group::value_objects::{GroupKind, OrderSide, OrderType, ProductType};
use crate::domain::shared::{ClientId, Exchange, InstrumentId, Price, Quantity, Timestamp};
use crate::domain::triggers::TriggerOperator;

/// Price instructions for a leg that goes to the exchange as a plain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPricing {
    /// Order type.
    pub order_type: OrderType,
    /// Limit price, required for limit-type orders.
    #[serde(default)]
    pub price: Option<Price>,
}

impl OrderPricing {
    /// Market order.
    #[must_use]
    pub const fn market() -> Self {
        Self {
            order_type: OrderType::Market,
            price: None,
        }
    }

    /// Limit order at `price`.
    #[must_use]
    pub const fn limit(price: Price) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
        }
    }
}

/// Stop-loss instructions for BO/CO groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopLossSpec {
    /// Stop trigger price (initial value when trailing).
    pub trigger_price: Price,
    /// Limit price once triggered; `None` for stop-loss-market.
    #[serde(default)]
    pub limit_price: Option<Price>,
    /// Trailing distance; held locally and armed once the entry fills.
    #[serde(default)]
    pub trailing_offset: Option<Decimal>,
}

/// The second leg of a spread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadLegSpec {
    /// Instrument of the far leg.
    pub instrument: InstrumentId,
    /// Side of the far leg.
    pub side: OrderSide,
    /// Pricing of the far leg.
    pub pricing: OrderPricing,
}

/// Trigger for a single GTT order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GttTriggerSpec {
    /// Comparison against LTP.
    pub operator: TriggerOperator,
    /// Trigger price.
    pub trigger_price: Price,
    /// Optional trailing distance.
    #[serde(default)]
    pub trailing_offset: Option<Decimal>,
}

/// One side of a GTT-OCO pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GttOcoLegSpec {
    /// Trigger price.
    pub trigger_price: Price,
    /// Order placed when the trigger fires.
    pub pricing: OrderPricing,
}

/// Kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupParams {
    /// Bracket order.
    Bracket {
        /// Entry pricing.
        entry: OrderPricing,
        /// Target limit price.
        target_price: Price,
        /// Stop-loss.
        stop_loss: StopLossSpec,
    },
    /// Cover order.
    Cover {
        /// Entry pricing.
        entry: OrderPricing,
        /// Compulsory stop-loss.
        stop_loss: StopLossSpec,
    },
    /// Two-legged spread; the near leg uses the group's instrument and side.
    Spread {
        /// Near leg pricing.
        near: OrderPricing,
        /// Far leg.
        far: SpreadLegSpec,
    },
    /// Single good-till-triggered order.
    Gtt {
        /// Trigger.
        trigger: GttTriggerSpec,
        /// Order placed on fire.
        pricing: OrderPricing,
    },
    /// Good-till-triggered OCO pair (upper fires at `>=`, lower at `<=`).
    GttOco {
        /// Upper leg.
        upper: GttOcoLegSpec,
        /// Lower leg.
        lower: GttOcoLegSpec,
    },
    /// Disclosed-quantity order.
    Iceberg {
        /// Quantity shown per slice.
        disclose_quantity: Quantity,
        /// Pricing applied to every slice.
        pricing: OrderPricing,
    },
}

impl GroupParams {
    /// Group kind these parameters describe.
    #[must_use]
    pub const fn kind(&self) -> GroupKind {
        match self {
            Self::Bracket { .. } => GroupKind::Bracket,
            Self::Cover { .. } => GroupKind::Cover,
            Self::Spread { .. } => GroupKind::Spread,
            Self::Gtt { .. } => GroupKind::Gtt,
            Self::GttOco { .. } => GroupKind::GttOco,
            Self::Iceberg { .. } => GroupKind::Iceberg,
        }
    }
}

/// Command to create a new order group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupCommand {
    /// Account placing the order.
    pub client_id: ClientId,
    /// Primary instrument.
    pub instrument: InstrumentId,
    /// Exchange segment.
    pub exchange: Exchange,
    /// Product type.
    pub product: ProductType,
    /// Side of the opening leg(s).
    pub side: OrderSide,
    /// Total quantity.
    pub quantity: Quantity,
    /// Optional expiry.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    /// Kind-specific parameters.
    pub params: GroupParams,
}

impl CreateGroupCommand {
    /// Group kind.
    #[must_use]
    pub const fn kind(&self) -> GroupKind {
        self.params.kind()
    }

    /// Structural validation the aggregate cannot be built without.
    ///
    /// Business rules (allowed exchanges, price sides, limits) are checked
    /// by the admission policy before this is reached.
    ///
    /// # Errors
    ///
    /// Returns error if quantity or a required price is missing or not positive.
    pub fn validate(&self) -> Result<(), OrderGroupError> {
        if !self.quantity.is_positive() {
            return Err(invalid("quantity", "quantity must be positive"));
        }

        match &self.params {
            GroupParams::Bracket {
                entry, stop_loss, ..
            }
            | GroupParams::Cover { entry, stop_loss } => {
                validate_pricing("entry", entry)?;
                if !stop_loss.trigger_price.is_positive() {
                    return Err(invalid("stop_loss.trigger_price", "must be positive"));
                }
            }
            GroupParams::Spread { near, far } => {
                validate_pricing("near", near)?;
                validate_pricing("far", &far.pricing)?;
            }
            GroupParams::Gtt { trigger, pricing } => {
                validate_pricing("order", pricing)?;
                if !trigger.trigger_price.is_positive() {
                    return Err(invalid("trigger.trigger_price", "must be positive"));
                }
            }
            GroupParams::GttOco { upper, lower } => {
                validate_pricing("upper", &upper.pricing)?;
                validate_pricing("lower", &lower.pricing)?;
            }
            GroupParams::Iceberg { pricing, .. } => validate_pricing("order", pricing)?,
        }
        Ok(())
    }
}

fn validate_pricing(field: &str, pricing: &OrderPricing) -> Result<(), OrderGroupError> {
    if pricing.order_type.requires_price() {
        match pricing.price {
            Some(p) if p.is_positive() => {}
            Some(_) => return Err(invalid(&format!("{field}.price"), "must be positive")),
            None => {
                return Err(invalid(
                    &format!("{field}.price"),
                    "price required for limit orders",
                ))
            }
        }
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> OrderGroupError {
    OrderGroupError::InvalidParameters {
        field: field.to_string(),
        message: message.to_string(),
    }
}
