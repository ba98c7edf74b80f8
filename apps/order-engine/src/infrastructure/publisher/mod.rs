//! Event Publishers
//!
//! Implementations of the `EventPublisherPort`.

pub mod broadcast;

pub use broadcast::BroadcastEventPublisher;
