//! Leg Order Coordinator
//!
//! The single writer of order group state. Every client request, execution
//! report and trigger firing for a group runs under that group's lock:
//!
//! 1. The aggregate applies the transition (idempotent, terminal-frozen)
//! 2. The cascade policy decides what else has to move
//! 3. The actions run in order against the adapter and the evaluator
//! 4. State is saved, events appended and published
//! 5. Terminal groups are archived and leave the registry
//!
//! Adapter, store, publisher and evaluator are injected; nothing here is
//! global.

mod actions;
mod recovery;

use std::sync::Arc;

use crate::application::dto::{GroupHistoryDto, GroupSnapshotDto};
use crate::application::errors::EngineError;
use crate::application::ports::{EventPublisherPort, ExecutionAdapter, ModifyOrderRequest};
use crate::application::services::adapter_retry::{AdapterRetryPolicy, with_retry};
use crate::application::services::group_registry::{GroupHandle, GroupRegistry};
use crate::application::services::trigger_evaluator::TriggerEvaluator;
use crate::domain::admission::{AdmissionLimits, AdmissionPolicy};
use crate::domain::iceberg::IcebergSlicer;
use crate::domain::order_group::{
    CancelReason, CascadePolicy, CreateGroupCommand, ExecutionOutcome, ExecutionReport, LegRole,
    LegModification, OrderGroup, OrderGroupError, OrderStore,
};
use crate::domain::shared::{GroupId, Timestamp};
use crate::domain::triggers::{Tick, TickEvaluation, TriggerEvaluationError, TriggerFired};
use crate::observability::{
    record_admission_rejected, record_group_created, record_ignored_event,
    record_leg_transition, record_tick_rejected, record_trigger_fired, set_active_groups,
};

pub use recovery::RecoveryReport;

/// Who asked for a batch of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// A client request; failures surface to the caller.
    Client,
    /// A cascade from an event; failures are logged.
    Cascade,
}

/// Coordinates order groups across the adapter, the trigger evaluator and
/// the store.
pub struct LegOrderCoordinator<A, S, P>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
{
    adapter: Arc<A>,
    store: Arc<S>,
    publisher: Arc<P>,
    evaluator: Arc<TriggerEvaluator>,
    registry: GroupRegistry,
    admission: AdmissionPolicy,
    slicer: IcebergSlicer,
    retry: AdapterRetryPolicy,
}

impl<A, S, P> LegOrderCoordinator<A, S, P>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
{
    /// Create a coordinator with default admission limits, slicer and retry
    /// policy.
    pub fn new(
        adapter: Arc<A>,
        store: Arc<S>,
        publisher: Arc<P>,
        evaluator: Arc<TriggerEvaluator>,
    ) -> Self {
        Self {
            adapter,
            store,
            publisher,
            evaluator,
            registry: GroupRegistry::new(),
            admission: AdmissionPolicy::new(AdmissionLimits::default()),
            slicer: IcebergSlicer::default(),
            retry: AdapterRetryPolicy::default(),
        }
    }

    /// Use these admission limits.
    #[must_use]
    pub fn with_admission_limits(mut self, limits: AdmissionLimits) -> Self {
        self.admission = AdmissionPolicy::new(limits);
        self
    }

    /// Use this iceberg slicer.
    #[must_use]
    pub fn with_slicer(mut self, slicer: IcebergSlicer) -> Self {
        self.slicer = slicer;
        self
    }

    /// Use this adapter retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: AdapterRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Trigger evaluator shared with the tick pump.
    #[must_use]
    pub fn evaluator(&self) -> &Arc<TriggerEvaluator> {
        &self.evaluator
    }

    /// Number of live groups.
    #[must_use]
    pub fn active_groups(&self) -> usize {
        self.registry.len()
    }

    // ========================================================================
    // Intake
    // ========================================================================

    /// Admit and create a group, then release its first legs.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if admission refuses the request or the group
    /// cannot be built, or `Store` if the new group cannot be saved.
    pub async fn create_group(&self, cmd: CreateGroupCommand) -> Result<GroupId, EngineError> {
        if let Err(e) = self.admission.admit(&cmd, Timestamp::now()) {
            for code in e.codes() {
                record_admission_rejected(code);
            }
            tracing::warn!(
                client_id = %cmd.client_id,
                kind = cmd.kind().code(),
                error = %e,
                "Order group refused at admission"
            );
            return Err(e.into());
        }

        let group = OrderGroup::new(cmd, &self.slicer)?;
        let group_id = group.id().clone();
        record_group_created(group.kind());
        tracing::info!(
            group_id = %group_id,
            kind = group.kind().code(),
            instrument = %group.instrument(),
            quantity = %group.total_quantity(),
            legs = group.legs().len(),
            "Order group created"
        );

        let handle = self.registry.insert(group);
        set_active_groups(self.registry.len());
        let mut group = handle.lock().await;
        let actions = CascadePolicy::on_created(&group);
        let outcome = self.execute(&mut group, actions, Origin::Cascade).await;
        self.commit(&mut group).await?;
        outcome?;
        Ok(group_id)
    }

    /// Cancel the leg with `role`, cascading per group kind.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the leg already filled (fill wins) or closed,
    /// `NotFound` for an unknown group or role, `Adapter` if the cancel
    /// could not reach the exchange.
    pub async fn cancel_leg(
        &self,
        group_id: &GroupId,
        role: LegRole,
    ) -> Result<GroupSnapshotDto, EngineError> {
        let handle = self.live_handle(group_id).await?;
        let mut group = handle.lock().await;
        let actions = CascadePolicy::on_user_cancel(&group, role)?;
        tracing::info!(group_id = %group_id, role = %role, "Leg cancel requested");

        let outcome = self.execute(&mut group, actions, Origin::Client).await;
        self.commit(&mut group).await?;
        outcome?;
        Ok(GroupSnapshotDto::from_group(&group))
    }

    /// Cancel every live leg of a group and square off any open entry.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the group already closed or a leg filled while
    /// cancelling, `NotFound` for an unknown group.
    pub async fn cancel_group(&self, group_id: &GroupId) -> Result<GroupSnapshotDto, EngineError> {
        let handle = self.live_handle(group_id).await?;
        let mut group = handle.lock().await;
        let actions = CascadePolicy::on_group_cancel(&group, CancelReason::user_requested())?;
        tracing::info!(group_id = %group_id, actions = actions.len(), "Group cancel requested");

        let outcome = self.execute(&mut group, actions, Origin::Client).await;
        self.commit(&mut group).await?;
        outcome?;
        Ok(GroupSnapshotDto::from_group(&group))
    }

    /// Modify an unfilled leg.
    ///
    /// Working legs are amended at the exchange first; local legs change in
    /// place and any armed trigger is re-armed with the new values.
    ///
    /// # Errors
    ///
    /// Returns `Validation` or `Conflict` if the modification is not
    /// allowed, `Adapter` if the exchange refused the amendment.
    pub async fn modify_leg(
        &self,
        group_id: &GroupId,
        role: LegRole,
        modification: LegModification,
    ) -> Result<GroupSnapshotDto, EngineError> {
        let handle = self.live_handle(group_id).await?;
        let mut group = handle.lock().await;
        let leg = group
            .leg_by_role(role)
            .ok_or(OrderGroupError::RoleNotFound { role })?;
        let leg_id = leg.id().clone();
        let working_order = leg
            .status()
            .is_working()
            .then(|| leg.exchange_order_id().cloned())
            .flatten();

        // Dry run so the exchange never sees an amendment the aggregate refuses.
        group.clone().modify_leg(&leg_id, &modification)?;

        if let Some(exchange_order_id) = working_order {
            let request = ModifyOrderRequest::new(exchange_order_id)
                .with_price(modification.price)
                .with_trigger_price(modification.trigger_price)
                .with_quantity(modification.quantity);
            with_retry(&self.retry, "modify_leg", || {
                self.adapter.modify_leg(request.clone())
            })
            .await?;
        }

        group.modify_leg(&leg_id, &modification)?;
        if self.evaluator.deregister(&leg_id).is_some() {
            self.arm(&group, &leg_id);
        }
        tracing::info!(group_id = %group_id, leg_id = %leg_id, role = %role, "Leg modified");

        self.commit(&mut group).await?;
        Ok(GroupSnapshotDto::from_group(&group))
    }

    /// Current snapshot of a live or archived group.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group is unknown, `Store` if loading fails.
    pub async fn fetch_group(&self, group_id: &GroupId) -> Result<GroupSnapshotDto, EngineError> {
        if let Some(handle) = self.registry.get(group_id) {
            return Ok(GroupSnapshotDto::from_group(&*handle.lock().await));
        }
        self.store
            .load_group(group_id)
            .await?
            .map(|group| GroupSnapshotDto::from_group(&group))
            .ok_or_else(|| EngineError::GroupNotFound {
                group_id: group_id.clone(),
            })
    }

    /// Event history of a group, including every cascade and its reason.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group is unknown, `Store` if loading fails.
    pub async fn fetch_history(&self, group_id: &GroupId) -> Result<GroupHistoryDto, EngineError> {
        let log = self.store.event_log(group_id).await?;
        if log.is_empty() && self.store.load_group(group_id).await?.is_none() {
            return Err(EngineError::GroupNotFound {
                group_id: group_id.clone(),
            });
        }
        Ok(GroupHistoryDto::from_log(group_id, &log))
    }

    // ========================================================================
    // Event Inputs
    // ========================================================================

    /// Apply an execution report from the adapter's event stream.
    ///
    /// Duplicates, reports for closed groups and reports for unknown
    /// exchange orders are recorded and ignored.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the report contradicts the leg's state, `Store`
    /// if persisting the result fails.
    pub async fn on_execution_report(&self, report: ExecutionReport) -> Result<(), EngineError> {
        let Some(group_id) = self
            .registry
            .group_for_exchange_order(&report.exchange_order_id)
        else {
            record_ignored_event("unknown_exchange_order");
            tracing::warn!(
                exchange_order_id = %report.exchange_order_id,
                event_id = %report.event_id,
                kind = report.kind.name(),
                "Execution report for an unknown or closed order ignored"
            );
            return Ok(());
        };
        let Some(handle) = self.registry.get(&group_id) else {
            record_ignored_event("group_closed");
            return Ok(());
        };

        let mut group = handle.lock().await;
        let update = match group.apply_execution(&report) {
            Ok(ExecutionOutcome::Applied(update)) => update,
            Ok(ExecutionOutcome::Duplicate) => {
                record_ignored_event("duplicate");
                tracing::debug!(
                    group_id = %group_id,
                    exchange_order_id = %report.exchange_order_id,
                    event_id = %report.event_id,
                    "Duplicate execution report ignored"
                );
                return Ok(());
            }
            Err(OrderGroupError::GroupTerminal { status, .. }) => {
                record_ignored_event("group_terminal");
                tracing::warn!(
                    group_id = %group_id,
                    status = %status,
                    kind = report.kind.name(),
                    "Execution report after group closed ignored"
                );
                return Ok(());
            }
            Err(e) => {
                record_ignored_event("contradicts_state");
                tracing::warn!(group_id = %group_id, error = %e, "Execution report refused");
                return Err(e.into());
            }
        };

        if update.changed() {
            record_leg_transition(update.role, update.current);
            tracing::info!(
                group_id = %group_id,
                leg_id = %update.leg_id,
                role = %update.role,
                from = %update.previous,
                to = %update.current,
                event = report.kind.name(),
                "Leg transition"
            );
        }

        let actions = CascadePolicy::on_leg_update(&group, &update);
        let outcome = self.execute(&mut group, actions, Origin::Cascade).await;
        self.commit(&mut group).await?;
        outcome
    }

    /// Evaluate a market tick and apply whatever it fired or moved.
    ///
    /// # Errors
    ///
    /// Returns `Trigger` for a stale or non-positive tick; armed triggers are
    /// left in place.
    pub async fn on_market_tick(&self, tick: &Tick) -> Result<TickEvaluation, EngineError> {
        let evaluation = match self.evaluator.on_tick(tick) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                record_tick_rejected(match e {
                    TriggerEvaluationError::StaleTick { .. } => "stale",
                    TriggerEvaluationError::NonPositivePrice { .. } => "non_positive",
                    _ => "invalid",
                });
                tracing::warn!(instrument = %tick.instrument, error = %e, "Tick rejected");
                return Err(e.into());
            }
        };

        for adjusted in &evaluation.adjusted {
            let Some(handle) = self.registry.get(&adjusted.group_id) else {
                continue;
            };
            let mut group = handle.lock().await;
            match group.adjust_trigger(&adjusted.leg_id, adjusted.current) {
                Ok(()) => {
                    tracing::debug!(
                        group_id = %adjusted.group_id,
                        leg_id = %adjusted.leg_id,
                        previous = %adjusted.previous,
                        current = %adjusted.current,
                        "Trailing trigger moved"
                    );
                    self.commit(&mut group).await?;
                }
                Err(e) => {
                    tracing::warn!(leg_id = %adjusted.leg_id, error = %e, "Trigger adjustment dropped");
                }
            }
        }

        for fired in &evaluation.fired {
            self.on_trigger_fired(fired).await?;
        }
        Ok(evaluation)
    }

    /// Close every live group whose expiry has passed.
    ///
    /// Returns the groups that were expired.
    ///
    /// # Errors
    ///
    /// Returns `Store` if persisting an expired group fails.
    pub async fn expire_due(&self, now: Timestamp) -> Result<Vec<GroupId>, EngineError> {
        let mut expired = Vec::new();
        for group_id in self.registry.ids() {
            let Some(handle) = self.registry.get(&group_id) else {
                continue;
            };
            let mut group = handle.lock().await;
            if group.is_terminal() || !group.is_expired(now) {
                continue;
            }
            let actions = CascadePolicy::on_group_cancel(&group, CancelReason::expired())?;
            tracing::info!(group_id = %group_id, "Order group expired");

            if let Err(e) = self.execute(&mut group, actions, Origin::Cascade).await {
                tracing::warn!(group_id = %group_id, error = %e, "Expiry left legs open");
            }
            self.commit(&mut group).await?;
            expired.push(group_id);
        }
        Ok(expired)
    }

    /// Retry fired legs still held behind a working OCO sibling.
    ///
    /// A fired trailing stop waits for the target to close. When the
    /// target cancel failed, this reissues it and submits the stop once
    /// it lands. Returns the number of groups retried.
    ///
    /// # Errors
    ///
    /// Returns `Store` if persisting a retried group fails.
    pub async fn retry_held_submissions(&self) -> Result<usize, EngineError> {
        let mut retried = 0;
        for group_id in self.registry.ids() {
            let Some(handle) = self.registry.get(&group_id) else {
                continue;
            };
            let mut group = handle.lock().await;
            let actions = CascadePolicy::on_held_retry(&group);
            if actions.is_empty() {
                continue;
            }
            tracing::info!(group_id = %group_id, "Retrying held submission");

            if let Err(e) = self.execute(&mut group, actions, Origin::Cascade).await {
                tracing::warn!(group_id = %group_id, error = %e, "Held submission still blocked");
            }
            self.commit(&mut group).await?;
            retried += 1;
        }
        Ok(retried)
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    async fn on_trigger_fired(&self, fired: &TriggerFired) -> Result<(), EngineError> {
        let Some(handle) = self.registry.get(&fired.group_id) else {
            record_ignored_event("group_closed");
            return Ok(());
        };
        let mut group = handle.lock().await;

        let recorded = group.leg(&fired.leg_id).and_then(|l| l.trigger_price());
        if recorded != Some(fired.trigger_price) {
            if let Err(e) = group.adjust_trigger(&fired.leg_id, fired.trigger_price) {
                tracing::debug!(leg_id = %fired.leg_id, error = %e, "Trigger price not synced");
            }
        }

        let update = match group.mark_leg_triggered(&fired.leg_id, fired.ltp) {
            Ok(update) => update,
            Err(e) => {
                record_ignored_event("trigger_not_applicable");
                tracing::warn!(
                    group_id = %fired.group_id,
                    leg_id = %fired.leg_id,
                    error = %e,
                    "Fired trigger could not be applied"
                );
                return Ok(());
            }
        };

        record_trigger_fired(group.kind());
        record_leg_transition(update.role, update.current);
        tracing::info!(
            group_id = %fired.group_id,
            leg_id = %fired.leg_id,
            role = %update.role,
            trigger_price = %fired.trigger_price,
            ltp = %fired.ltp,
            "Trigger fired"
        );

        let actions = CascadePolicy::on_trigger_fired(&group, &fired.leg_id);
        let outcome = self.execute(&mut group, actions, Origin::Cascade).await;
        self.commit(&mut group).await?;
        outcome
    }

    /// Handle for a live group; archived groups answer `GroupTerminal`.
    async fn live_handle(&self, group_id: &GroupId) -> Result<GroupHandle, EngineError> {
        if let Some(handle) = self.registry.get(group_id) {
            return Ok(handle);
        }
        match self.store.load_group(group_id).await? {
            Some(group) if group.is_terminal() => Err(OrderGroupError::GroupTerminal {
                group_id: group_id.clone(),
                status: group.status(),
            }
            .into()),
            _ => Err(EngineError::GroupNotFound {
                group_id: group_id.clone(),
            }),
        }
    }
}
