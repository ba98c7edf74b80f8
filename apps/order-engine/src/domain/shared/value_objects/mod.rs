//! Value objects shared across bounded contexts.

mod exchange;
mod identifiers;
mod price;
mod quantity;
mod timestamp;

pub use exchange::Exchange;
pub use identifiers::{ClientId, EventId, ExchangeOrderId, GroupId, InstrumentId, LegId};
pub use price::Price;
pub use quantity::Quantity;
pub use timestamp::Timestamp;
