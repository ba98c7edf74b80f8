//! Live order groups, each behind its own async mutex.
//!
//! The per-group lock serializes every writer of a group (execution reports,
//! trigger firings, client requests) so a cancel and a fill for the same
//! group never interleave. Different groups proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::domain::order_group::OrderGroup;
use crate::domain::shared::{ExchangeOrderId, GroupId};

/// Shared handle to one live group.
pub type GroupHandle = Arc<Mutex<OrderGroup>>;

/// Registry of non-terminal groups.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<GroupId, GroupHandle>>,
    by_exchange_order: RwLock<HashMap<ExchangeOrderId, GroupId>>,
}

impl GroupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group and index the exchange orders its legs already carry.
    pub fn insert(&self, group: OrderGroup) -> GroupHandle {
        let id = group.id().clone();
        let exchange_orders: Vec<ExchangeOrderId> = group
            .legs()
            .iter()
            .filter_map(|l| l.exchange_order_id().cloned())
            .collect();
        let handle = Arc::new(Mutex::new(group));

        self.groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::clone(&handle));
        let mut index = self
            .by_exchange_order
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for ex in exchange_orders {
            index.insert(ex, id.clone());
        }
        handle
    }

    /// Handle for a live group.
    #[must_use]
    pub fn get(&self, id: &GroupId) -> Option<GroupHandle> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Route future execution reports for `exchange_order_id` to `group_id`.
    pub fn index_exchange_order(&self, exchange_order_id: ExchangeOrderId, group_id: GroupId) {
        self.by_exchange_order
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(exchange_order_id, group_id);
    }

    /// Group that owns an exchange order.
    #[must_use]
    pub fn group_for_exchange_order(&self, exchange_order_id: &ExchangeOrderId) -> Option<GroupId> {
        self.by_exchange_order
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(exchange_order_id)
            .cloned()
    }

    /// Drop a group and its exchange order routes.
    pub fn remove(&self, id: &GroupId) -> Option<GroupHandle> {
        let removed = self
            .groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        self.by_exchange_order
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, group_id| group_id != id);
        removed
    }

    /// Ids of every live group.
    #[must_use]
    pub fn ids(&self) -> Vec<GroupId> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of live groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no group is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
