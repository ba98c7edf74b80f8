//! In-process fan-out of group events over a tokio broadcast channel.
//!
//! Every subscriber sees every event in publish order. A subscriber that
//! falls more than `capacity` events behind observes `Lagged` and skips
//! ahead; the event log in the store remains the source of truth.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::order_group::GroupEvent;

/// Publisher backed by a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<GroupEvent>,
}

impl BroadcastEventPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a new subscriber; it only sees events published afterwards.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GroupEvent> {
        self.sender.subscribe()
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisherPort for BroadcastEventPublisher {
    async fn publish_group_events(&self, events: Vec<GroupEvent>) -> Result<(), EventPublishError> {
        for event in events {
            // No subscriber is not an error; the store already holds the event.
            if self.sender.send(event).is_err() {
                tracing::trace!("Group event published with no subscribers");
            }
        }
        Ok(())
    }
}
