//! Startup recovery: reload live groups, re-arm their triggers and compare
//! working legs against the adapter's open orders.

use std::collections::HashSet;

use serde::Serialize;

use super::{LegOrderCoordinator, Origin};
use crate::application::errors::EngineError;
use crate::application::ports::{EventPublisherPort, ExecutionAdapter};
use crate::application::services::adapter_retry::with_retry;
use crate::domain::order_group::{CascadeAction, LegStatus, OrderGroup, OrderStore};
use crate::domain::shared::{ExchangeOrderId, GroupId, LegId};
use crate::observability::set_active_groups;

/// What recovery found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Groups loaded back into memory.
    pub recovered_groups: usize,
    /// Triggers armed again.
    pub armed_triggers: usize,
    /// Fired legs whose submission was interrupted and retried.
    pub resubmitted: usize,
    /// Working legs the adapter no longer lists.
    pub missing_at_exchange: Vec<(GroupId, LegId)>,
    /// False if the adapter's open orders could not be fetched.
    pub open_orders_checked: bool,
}

impl<A, S, P> LegOrderCoordinator<A, S, P>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
{
    /// Reload every non-terminal group from the store.
    ///
    /// Groups already live in memory are left alone. Working legs missing
    /// at the exchange are reported, not changed; their fate arrives on the
    /// execution stream.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the active groups cannot be loaded.
    pub async fn recover(&self) -> Result<RecoveryReport, EngineError> {
        let groups = self.store.find_active_groups().await?;
        let mut report = RecoveryReport::default();

        let open: Option<HashSet<ExchangeOrderId>> =
            match with_retry(&self.retry, "open_orders", || self.adapter.open_orders()).await {
                Ok(orders) => {
                    report.open_orders_checked = true;
                    Some(orders.into_iter().map(|o| o.exchange_order_id).collect())
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Open orders unavailable, skipping comparison");
                    None
                }
            };

        for group in groups {
            if self.registry.get(group.id()).is_some() {
                continue;
            }
            let group_id = group.id().clone();

            if let Some(open) = &open {
                for leg in group.legs().iter().filter(|l| l.status().is_working()) {
                    let listed = leg.exchange_order_id().is_some_and(|id| open.contains(id));
                    if !listed {
                        tracing::warn!(
                            group_id = %group_id,
                            leg_id = %leg.id(),
                            role = %leg.role(),
                            "Working leg not listed by the adapter"
                        );
                        report
                            .missing_at_exchange
                            .push((group_id.clone(), leg.id().clone()));
                    }
                }
            }

            let to_arm = armable_legs(&group);
            let fired: Vec<CascadeAction> = group
                .legs()
                .iter()
                .filter(|l| l.status() == LegStatus::Triggered)
                .map(|l| CascadeAction::Submit {
                    leg_id: l.id().clone(),
                })
                .collect();

            let handle = self.registry.insert(group);
            let mut group = handle.lock().await;
            for leg_id in &to_arm {
                self.arm(&group, leg_id);
            }
            report.armed_triggers += to_arm.len();
            report.resubmitted += fired.len();
            if !fired.is_empty() {
                self.execute(&mut group, fired, Origin::Cascade).await?;
                self.commit(&mut group).await?;
            }
            report.recovered_groups += 1;
        }

        set_active_groups(self.registry.len());
        tracing::info!(
            recovered = report.recovered_groups,
            armed = report.armed_triggers,
            resubmitted = report.resubmitted,
            missing = report.missing_at_exchange.len(),
            "Recovery complete"
        );
        Ok(report)
    }
}

/// Created trigger-held legs whose dependency (if any) has filled.
fn armable_legs(group: &OrderGroup) -> Vec<LegId> {
    group
        .legs()
        .iter()
        .filter(|l| l.status() == LegStatus::Created && l.is_trigger_held())
        .filter(|l| {
            l.depends_on()
                .and_then(|dep| group.leg(dep))
                .is_none_or(|dep| dep.status() == LegStatus::Filled)
        })
        .map(|l| l.id().clone())
        .collect()
}
