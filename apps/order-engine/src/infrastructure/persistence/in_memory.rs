//! In-memory order store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::order_group::{
    GroupEvent, GroupRecord, OrderGroup, OrderStore, StoreError, StoredEvent,
};
use crate::domain::shared::{GroupId, Timestamp};

#[derive(Debug, Clone)]
struct Entry {
    group: OrderGroup,
    archived: bool,
}

/// In-memory implementation of `OrderStore`.
///
/// Keeps the latest state of every group plus its append-only event log.
/// State is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    groups: RwLock<HashMap<GroupId, Entry>>,
    logs: RwLock<HashMap<GroupId, Vec<StoredEvent>>>,
    unavailable: AtomicBool,
}

impl InMemoryOrderStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups stored, live or archived.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate an outage: every call fails with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save_group(&self, group: &OrderGroup) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let archived = groups.get(group.id()).is_some_and(|e| e.archived);
        groups.insert(
            group.id().clone(),
            Entry {
                group: group.clone(),
                archived,
            },
        );
        Ok(())
    }

    async fn load_group(&self, id: &GroupId) -> Result<Option<OrderGroup>, StoreError> {
        self.ensure_available()?;
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.get(id).map(|e| e.group.clone()))
    }

    async fn find_active_groups(&self) -> Result<Vec<OrderGroup>, StoreError> {
        self.ensure_available()?;
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        let mut active: Vec<OrderGroup> = groups
            .values()
            .filter(|e| !e.archived && !e.group.is_terminal())
            .map(|e| e.group.clone())
            .collect();
        active.sort_by_key(OrderGroup::created_at);
        Ok(active)
    }

    async fn append_events(
        &self,
        group_id: &GroupId,
        events: &[GroupEvent],
    ) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        let log = logs.entry(group_id.clone()).or_default();
        let recorded_at = Timestamp::now();
        for event in events {
            let sequence = log.len() as u64 + 1;
            log.push(StoredEvent {
                sequence,
                group_id: group_id.clone(),
                event: event.clone(),
                recorded_at,
            });
        }
        Ok(log.len() as u64)
    }

    async fn event_log(&self, group_id: &GroupId) -> Result<Vec<StoredEvent>, StoreError> {
        self.ensure_available()?;
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(logs.get(group_id).cloned().unwrap_or_default())
    }

    async fn snapshot(&self, group_id: &GroupId) -> Result<Option<GroupRecord>, StoreError> {
        self.ensure_available()?;
        let last_sequence = self
            .logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group_id)
            .map_or(0, |log| log.len() as u64);
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.get(group_id).map(|e| GroupRecord {
            group: e.group.clone(),
            last_sequence,
            archived: e.archived,
        }))
    }

    async fn archive(&self, group_id: &GroupId) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let entry = groups.get_mut(group_id).ok_or_else(|| StoreError::NotFound {
            group_id: group_id.clone(),
        })?;
        entry.archived = true;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}
