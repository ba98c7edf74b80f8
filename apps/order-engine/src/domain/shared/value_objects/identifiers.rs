//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up a leg id with the exchange's order id, which is
//! the single most common bug in multi-leg order plumbing.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(GroupId, "Unique identifier for an order group.");
define_id!(LegId, "Unique identifier for a leg within an order group.");
define_id!(ClientId, "Brokerage client (account holder) identifier.");
define_id!(
    ExchangeOrderId,
    "Order identifier assigned by the execution adapter/exchange."
);
define_id!(
    EventId,
    "Idempotency identifier attached to every execution event."
);
define_id!(
    InstrumentId,
    "Identifier for a tradeable instrument (trading symbol or token)."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_new_and_display() {
        let id = GroupId::new("grp-123");
        assert_eq!(id.as_str(), "grp-123");
        assert_eq!(format!("{id}"), "grp-123");
    }

    #[test]
    fn leg_id_generate_is_unique() {
        let id1 = LegId::generate();
        let id2 = LegId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn exchange_order_id_from_conversions() {
        let id: ExchangeOrderId = "EX-1".into();
        assert_eq!(id.as_str(), "EX-1");

        let id: ExchangeOrderId = String::from("EX-2").into();
        assert_eq!(id.into_inner(), "EX-2");
    }

    #[test]
    fn instrument_id_keeps_trading_symbol() {
        let id = InstrumentId::new("NIFTY24DEC24000CE");
        assert_eq!(id.as_ref(), "NIFTY24DEC24000CE");
    }

    #[test]
    fn serde_is_transparent() {
        let id = EventId::new("evt-9");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"evt-9\"");
    }

    #[test]
    fn hash_works_for_collections() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(LegId::new("leg-1"));
        set.insert(LegId::new("leg-2"));
        set.insert(LegId::new("leg-1"));

        assert_eq!(set.len(), 2);
    }
}
