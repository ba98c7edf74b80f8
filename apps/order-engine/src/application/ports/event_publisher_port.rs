//! Event Publisher Port (Driven Port)
//!
//! Interface for forwarding order group events to downstream consumers
//! (notifications, reporting).

use async_trait::async_trait;

use crate::domain::order_group::GroupEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// No consumer is attached.
    #[error("Event publish connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError {
        /// Error details.
        message: String,
    },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed {
        /// Error details.
        message: String,
    },
}

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish group events in order.
    async fn publish_group_events(&self, events: Vec<GroupEvent>) -> Result<(), EventPublishError>;

    /// Publish a single group event.
    async fn publish_group_event(&self, event: GroupEvent) -> Result<(), EventPublishError> {
        self.publish_group_events(vec![event]).await
    }
}

/// Publisher that drops every event.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish_group_events(
        &self,
        _events: Vec<GroupEvent>,
    ) -> Result<(), EventPublishError> {
        Ok(())
    }
}
