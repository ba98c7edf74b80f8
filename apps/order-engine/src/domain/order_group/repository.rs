//! Order Store Trait
//!
//! Defines the persistence abstraction for order groups: the current state of
//! each group plus an append-only event log.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::aggregate::OrderGroup;
use super::events::GroupEvent;
use crate::domain::shared::{GroupId, Timestamp};

/// Errors from the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record for the group.
    #[error("Order group not found: {group_id}")]
    NotFound {
        /// Group id.
        group_id: GroupId,
    },

    /// The backing store could not be reached.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be encoded or decoded.
    #[error("Order store serialization error: {0}")]
    Serialization(String),
}

/// One entry in a group's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Position in the group's log, starting at 1.
    pub sequence: u64,
    /// Group.
    pub group_id: GroupId,
    /// Event payload.
    pub event: GroupEvent,
    /// When the store appended it.
    pub recorded_at: Timestamp,
}

/// Materialized current state of a group.
#[derive(Debug, Clone)]
pub struct GroupRecord {
    /// Latest saved state.
    pub group: OrderGroup,
    /// Sequence of the last appended event.
    pub last_sequence: u64,
    /// True once the group was archived.
    pub archived: bool,
}

/// Store trait for order group persistence.
///
/// This is a domain interface (port) that is implemented by
/// infrastructure adapters (in-memory, database, etc.).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Save the current state of a group (insert or update).
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn save_group(&self, group: &OrderGroup) -> Result<(), StoreError>;

    /// Load a group, live or archived.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn load_group(&self, id: &GroupId) -> Result<Option<OrderGroup>, StoreError>;

    /// All groups that have not reached a terminal status.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_active_groups(&self) -> Result<Vec<OrderGroup>, StoreError>;

    /// Append events to a group's log. Returns the last assigned sequence.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn append_events(
        &self,
        group_id: &GroupId,
        events: &[GroupEvent],
    ) -> Result<u64, StoreError>;

    /// A group's full event log in append order.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn event_log(&self, group_id: &GroupId) -> Result<Vec<StoredEvent>, StoreError>;

    /// Materialized snapshot of a group.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn snapshot(&self, group_id: &GroupId) -> Result<Option<GroupRecord>, StoreError>;

    /// Move a terminal group out of the active set.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group was never saved.
    async fn archive(&self, group_id: &GroupId) -> Result<(), StoreError>;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable.
    async fn health_check(&self) -> Result<(), StoreError>;
}
