//! Admission rule table.

use rust_decimal::Decimal;

use super::errors::{RuleViolation, ValidationError};
use super::limits::AdmissionLimits;
use crate::domain::order_group::aggregate::{CreateGroupCommand, GroupParams, OrderPricing};
use crate::domain::order_group::errors::OrderGroupError;
use crate::domain::order_group::value_objects::{OrderSide, ProductType};
use crate::domain::shared::Timestamp;

type Rule = fn(&CreateGroupCommand, &AdmissionLimits, Timestamp) -> Option<RuleViolation>;

/// Every admission rule, evaluated in order.
const RULES: &[Rule] = &[
    exchange_allowed,
    quantity_positive,
    quantity_within_max,
    limit_orders_priced,
    intraday_product,
    stop_loss_side,
    target_side,
    oco_triggers_ordered,
    disclose_positive,
    trailing_offset_positive,
    expiry_in_future,
];

/// Stateless admission policy over a set of limits.
#[derive(Debug, Clone, Default)]
pub struct AdmissionPolicy {
    limits: AdmissionLimits,
}

impl AdmissionPolicy {
    /// Create a policy with the given limits.
    #[must_use]
    pub const fn new(limits: AdmissionLimits) -> Self {
        Self { limits }
    }

    /// Limits in force.
    #[must_use]
    pub const fn limits(&self) -> &AdmissionLimits {
        &self.limits
    }

    /// Run every rule and collect the violations.
    #[must_use]
    pub fn check(&self, cmd: &CreateGroupCommand, now: Timestamp) -> Vec<RuleViolation> {
        RULES
            .iter()
            .filter_map(|rule| rule(cmd, &self.limits, now))
            .collect()
    }

    /// Admit a create command.
    ///
    /// # Errors
    ///
    /// Returns `RulesViolated` with every failed rule, or `Malformed` if the
    /// command cannot be turned into legs.
    pub fn admit(&self, cmd: &CreateGroupCommand, now: Timestamp) -> Result<(), ValidationError> {
        let violations = self.check(cmd, now);
        if !violations.is_empty() {
            return Err(ValidationError::RulesViolated { violations });
        }
        cmd.validate().map_err(|e| match e {
            OrderGroupError::InvalidParameters { field, message } => {
                ValidationError::Malformed { field, message }
            }
            other => ValidationError::Malformed {
                field: "order".to_string(),
                message: other.to_string(),
            },
        })
    }
}

// ============================================================================
// Rules
// ============================================================================

fn exchange_allowed(
    cmd: &CreateGroupCommand,
    limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    (!limits.allowed_exchanges.contains(&cmd.exchange)).then(|| {
        RuleViolation::new(
            "EXCHANGE_NOT_ALLOWED",
            "exchange",
            format!("{} is not an allowed exchange", cmd.exchange),
        )
    })
}

fn quantity_positive(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    (!cmd.quantity.is_positive()).then(|| {
        RuleViolation::new("QUANTITY_NOT_POSITIVE", "quantity", "quantity must be positive")
    })
}

fn quantity_within_max(
    cmd: &CreateGroupCommand,
    limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    (cmd.quantity > limits.max_quantity).then(|| {
        RuleViolation::new(
            "QUANTITY_EXCEEDS_MAX",
            "quantity",
            format!("{} exceeds maximum {}", cmd.quantity, limits.max_quantity),
        )
    })
}

fn limit_orders_priced(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    let unpriced = pricings(&cmd.params).into_iter().find(|(_, p)| {
        p.order_type.requires_price() && !p.price.is_some_and(|price| price.is_positive())
    });
    unpriced.map(|(field, p)| {
        RuleViolation::new(
            "PRICE_REQUIRED",
            format!("{field}.price"),
            format!("{:?} order needs a positive price", p.order_type),
        )
    })
}

fn intraday_product(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    (cmd.kind().has_entry_and_exits() && cmd.product != ProductType::Intraday).then(|| {
        RuleViolation::new(
            "PRODUCT_NOT_INTRADAY",
            "product",
            format!("{} orders must be intraday, got {}", cmd.kind(), cmd.product),
        )
    })
}

fn stop_loss_side(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    let (entry, stop_loss) = match &cmd.params {
        GroupParams::Bracket {
            entry, stop_loss, ..
        }
        | GroupParams::Cover { entry, stop_loss } => (entry, stop_loss),
        _ => return None,
    };
    let entry_price = entry.price?;
    let wrong = match cmd.side {
        OrderSide::Buy => stop_loss.trigger_price >= entry_price,
        OrderSide::Sell => stop_loss.trigger_price <= entry_price,
    };
    wrong.then(|| {
        RuleViolation::new(
            "STOP_LOSS_WRONG_SIDE",
            "stop_loss.trigger_price",
            format!(
                "stop-loss {} must be {} entry {entry_price} for a {} order",
                stop_loss.trigger_price,
                side_word(cmd.side, true),
                cmd.side
            ),
        )
    })
}

fn target_side(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    let GroupParams::Bracket {
        entry,
        target_price,
        ..
    } = &cmd.params
    else {
        return None;
    };
    let entry_price = entry.price?;
    let wrong = match cmd.side {
        OrderSide::Buy => *target_price <= entry_price,
        OrderSide::Sell => *target_price >= entry_price,
    };
    wrong.then(|| {
        RuleViolation::new(
            "TARGET_WRONG_SIDE",
            "target_price",
            format!(
                "target {target_price} must be {} entry {entry_price} for a {} order",
                side_word(cmd.side, false),
                cmd.side
            ),
        )
    })
}

fn oco_triggers_ordered(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    let GroupParams::GttOco { upper, lower } = &cmd.params else {
        return None;
    };
    (upper.trigger_price <= lower.trigger_price).then(|| {
        RuleViolation::new(
            "OCO_TRIGGERS_INVERTED",
            "upper.trigger_price",
            format!(
                "upper trigger {} must be above lower trigger {}",
                upper.trigger_price, lower.trigger_price
            ),
        )
    })
}

fn disclose_positive(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    let GroupParams::Iceberg {
        disclose_quantity, ..
    } = &cmd.params
    else {
        return None;
    };
    (!disclose_quantity.is_positive()).then(|| {
        RuleViolation::new(
            "DISCLOSE_NOT_POSITIVE",
            "disclose_quantity",
            "disclosed quantity must be positive",
        )
    })
}

fn trailing_offset_positive(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    _now: Timestamp,
) -> Option<RuleViolation> {
    let offset = match &cmd.params {
        GroupParams::Bracket { stop_loss, .. } | GroupParams::Cover { stop_loss, .. } => {
            stop_loss.trailing_offset
        }
        GroupParams::Gtt { trigger, .. } => trigger.trailing_offset,
        _ => None,
    }?;
    (offset <= Decimal::ZERO).then(|| {
        RuleViolation::new(
            "TRAILING_OFFSET_NOT_POSITIVE",
            "trailing_offset",
            format!("trailing offset {offset} must be positive"),
        )
    })
}

fn expiry_in_future(
    cmd: &CreateGroupCommand,
    _limits: &AdmissionLimits,
    now: Timestamp,
) -> Option<RuleViolation> {
    let expires_at = cmd.expires_at?;
    (expires_at <= now).then(|| {
        RuleViolation::new(
            "EXPIRY_IN_PAST",
            "expires_at",
            format!("expiry {expires_at} is not after {now}"),
        )
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn pricings(params: &GroupParams) -> Vec<(&'static str, OrderPricing)> {
    match params {
        GroupParams::Bracket { entry, .. } | GroupParams::Cover { entry, .. } => {
            vec![("entry", *entry)]
        }
        GroupParams::Spread { near, far } => vec![("near", *near), ("far", far.pricing)],
        GroupParams::Gtt { pricing, .. } | GroupParams::Iceberg { pricing, .. } => {
            vec![("order", *pricing)]
        }
        GroupParams::GttOco { upper, lower } => {
            vec![("upper", upper.pricing), ("lower", lower.pricing)]
        }
    }
}

fn side_word(side: OrderSide, stop_loss: bool) -> &'static str {
    match (side, stop_loss) {
        (OrderSide::Buy, true) | (OrderSide::Sell, false) => "below",
        (OrderSide::Buy, false) | (OrderSide::Sell, true) => "above",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_group::aggregate::{GttOcoLegSpec, StopLossSpec};
    use crate::domain::shared::{ClientId, Exchange, InstrumentId, Price, Quantity};
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn bracket(side: OrderSide, entry: i64, target: i64, stop: i64) -> CreateGroupCommand {
        CreateGroupCommand {
            client_id: ClientId::new("C1"),
            instrument: InstrumentId::new("TCS"),
            exchange: Exchange::Nse,
            product: ProductType::Intraday,
            side,
            quantity: Quantity::from_i64(10),
            expires_at: None,
            params: GroupParams::Bracket {
                entry: OrderPricing::limit(Price::from_i64(entry)),
                target_price: Price::from_i64(target),
                stop_loss: StopLossSpec {
                    trigger_price: Price::from_i64(stop),
                    limit_price: None,
                    trailing_offset: None,
                },
            },
        }
    }

    fn codes(cmd: &CreateGroupCommand) -> Vec<&'static str> {
        AdmissionPolicy::default()
            .check(cmd, Timestamp::now())
            .into_iter()
            .map(|v| v.code)
            .collect()
    }

    #[test_case(OrderSide::Buy, 100, 110, 95 ; "buy bracket ok")]
    #[test_case(OrderSide::Sell, 100, 90, 105 ; "sell bracket ok")]
    fn well_formed_bracket_is_admitted(side: OrderSide, entry: i64, target: i64, stop: i64) {
        let cmd = bracket(side, entry, target, stop);
        assert!(AdmissionPolicy::default().admit(&cmd, Timestamp::now()).is_ok());
    }

    #[test_case(OrderSide::Buy, 100, 110, 100, "STOP_LOSS_WRONG_SIDE" ; "buy stop at entry")]
    #[test_case(OrderSide::Buy, 100, 99, 95, "TARGET_WRONG_SIDE" ; "buy target below entry")]
    #[test_case(OrderSide::Sell, 100, 90, 95, "STOP_LOSS_WRONG_SIDE" ; "sell stop below entry")]
    #[test_case(OrderSide::Sell, 100, 101, 105, "TARGET_WRONG_SIDE" ; "sell target above entry")]
    fn bracket_price_sides(side: OrderSide, entry: i64, target: i64, stop: i64, code: &str) {
        assert_eq!(codes(&bracket(side, entry, target, stop)), vec![code]);
    }

    #[test_case(Exchange::Mcx, "EXCHANGE_NOT_ALLOWED" ; "exchange outside allow list")]
    fn exchange_allow_list(exchange: Exchange, code: &str) {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        cmd.exchange = exchange;
        assert_eq!(codes(&cmd), vec![code]);
    }

    #[test_case(0, "QUANTITY_NOT_POSITIVE" ; "zero quantity")]
    #[test_case(100_001, "QUANTITY_EXCEEDS_MAX" ; "above maximum")]
    fn quantity_bounds(quantity: i64, code: &str) {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        cmd.quantity = Quantity::from_i64(quantity);
        assert_eq!(codes(&cmd), vec![code]);
    }

    #[test]
    fn bracket_must_be_intraday() {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        cmd.product = ProductType::Delivery;
        assert_eq!(codes(&cmd), vec!["PRODUCT_NOT_INTRADAY"]);
    }

    #[test]
    fn unpriced_limit_entry_is_refused() {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        if let GroupParams::Bracket { entry, .. } = &mut cmd.params {
            entry.price = None;
        }
        assert_eq!(codes(&cmd), vec!["PRICE_REQUIRED"]);
    }

    #[test_case(120, 90, &[] ; "ordered triggers")]
    #[test_case(90, 90, &["OCO_TRIGGERS_INVERTED"] ; "equal triggers")]
    #[test_case(80, 90, &["OCO_TRIGGERS_INVERTED"] ; "inverted triggers")]
    fn oco_trigger_order(upper: i64, lower: i64, expected: &[&str]) {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        cmd.product = ProductType::Delivery;
        cmd.params = GroupParams::GttOco {
            upper: GttOcoLegSpec {
                trigger_price: Price::from_i64(upper),
                pricing: OrderPricing::market(),
            },
            lower: GttOcoLegSpec {
                trigger_price: Price::from_i64(lower),
                pricing: OrderPricing::market(),
            },
        };
        assert_eq!(codes(&cmd), expected.to_vec());
    }

    #[test_case(dec!(0) ; "zero offset")]
    #[test_case(dec!(-1.5) ; "negative offset")]
    fn trailing_offset_must_be_positive(offset: Decimal) {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        if let GroupParams::Bracket { stop_loss, .. } = &mut cmd.params {
            stop_loss.trailing_offset = Some(offset);
        }
        assert_eq!(codes(&cmd), vec!["TRAILING_OFFSET_NOT_POSITIVE"]);
    }

    #[test]
    fn zero_disclose_is_refused() {
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        cmd.params = GroupParams::Iceberg {
            disclose_quantity: Quantity::ZERO,
            pricing: OrderPricing::market(),
        };
        assert_eq!(codes(&cmd), vec!["DISCLOSE_NOT_POSITIVE"]);
    }

    #[test]
    fn past_expiry_is_refused() {
        let now = Timestamp::now();
        let mut cmd = bracket(OrderSide::Buy, 100, 110, 95);
        cmd.expires_at = Some(now.plus(chrono::Duration::seconds(-1)));
        let err = AdmissionPolicy::default().admit(&cmd, now).unwrap_err();
        assert_eq!(err.codes(), vec!["EXPIRY_IN_PAST"]);
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut cmd = bracket(OrderSide::Buy, 100, 90, 105);
        cmd.exchange = Exchange::Cds;
        assert_eq!(
            codes(&cmd),
            vec!["EXCHANGE_NOT_ALLOWED", "STOP_LOSS_WRONG_SIDE", "TARGET_WRONG_SIDE"]
        );
    }
}
