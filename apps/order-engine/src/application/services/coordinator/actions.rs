//! Runs cascade actions against the adapter and the trigger evaluator,
//! then persists and publishes the result.

use std::collections::VecDeque;

use super::{LegOrderCoordinator, Origin};
use crate::application::errors::EngineError;
use crate::application::ports::{
    AdapterError, EventPublisherPort, ExecutionAdapter, LegOrderRequest, ModifyOrderRequest,
    SquareOffRequest,
};
use crate::application::services::adapter_retry::with_retry;
use crate::domain::order_group::{
    CancelReason, CascadeAction, CascadePolicy, LegStatus, OrderGroup, OrderGroupError,
    OrderStore, RejectReason,
};
use crate::domain::shared::{LegId, Quantity};
use crate::domain::triggers::TriggerEvaluationError;
use crate::observability::{
    record_cascade, record_group_closed, record_leg_transition, set_active_groups,
};

impl<A, S, P> LegOrderCoordinator<A, S, P>
where
    A: ExecutionAdapter,
    S: OrderStore,
    P: EventPublisherPort,
{
    /// Run `actions` in order, appending any follow-ups a rejected
    /// submission produces.
    ///
    /// A cancel that loses to a fill cancels the batch's square-off: the
    /// fill closes the position instead. Client batches stop at the first
    /// failure; cascade batches log it and carry on.
    pub(super) async fn execute(
        &self,
        group: &mut OrderGroup,
        actions: Vec<CascadeAction>,
        origin: Origin,
    ) -> Result<(), EngineError> {
        let mut queue: VecDeque<CascadeAction> = actions.into();
        let mut lost_race = false;

        while let Some(action) = queue.pop_front() {
            if group.is_terminal() {
                tracing::debug!(
                    group_id = %group.id(),
                    remaining = queue.len() + 1,
                    "Group closed, dropping remaining actions"
                );
                break;
            }

            let result = match action {
                CascadeAction::Submit { leg_id } => self.submit(group, &leg_id, &mut queue).await,
                CascadeAction::ArmTrigger { leg_id } => {
                    self.arm(group, &leg_id);
                    Ok(())
                }
                CascadeAction::Cancel { leg_id, reason } => {
                    self.cancel(group, &leg_id, reason).await
                }
                CascadeAction::Resize { leg_id, quantity } => {
                    self.resize(group, &leg_id, quantity).await
                }
                CascadeAction::SquareOff { reason } if lost_race => {
                    tracing::info!(
                        group_id = %group.id(),
                        reason = %reason.code,
                        "Square-off skipped, a fill is closing the position"
                    );
                    Ok(())
                }
                CascadeAction::SquareOff { reason } => self.square_off(group, reason).await,
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_too_late() => {
                    lost_race = true;
                    tracing::info!(group_id = %group.id(), error = %e, "Cancel lost to a fill");
                    if origin == Origin::Client {
                        return Err(e);
                    }
                }
                Err(e) if origin == Origin::Client => return Err(e),
                Err(e) => {
                    tracing::error!(group_id = %group.id(), error = %e, "Cascade action failed");
                }
            }
        }
        Ok(())
    }

    async fn submit(
        &self,
        group: &mut OrderGroup,
        leg_id: &LegId,
        queue: &mut VecDeque<CascadeAction>,
    ) -> Result<(), EngineError> {
        let leg = group.leg(leg_id).ok_or_else(|| OrderGroupError::LegNotFound {
            leg_id: leg_id.clone(),
        })?;
        if !leg.status().is_local() {
            tracing::debug!(leg_id = %leg_id, status = %leg.status(), "Leg already left the engine");
            return Ok(());
        }
        if leg.status() == LegStatus::Triggered
            && group
                .oco_sibling(leg_id)
                .is_some_and(|s| !s.status().is_terminal())
        {
            // Released by on_exit_closed once the sibling is confirmed closed,
            // or by retry_held_submissions if the sibling cancel failed.
            tracing::info!(
                group_id = %group.id(),
                leg_id = %leg_id,
                "Submission held until the sibling closes"
            );
            return Ok(());
        }

        let request = LegOrderRequest::for_leg(group, leg);
        let role = leg.role();
        match with_retry(&self.retry, "submit_leg", || {
            self.adapter.submit_leg(request.clone())
        })
        .await
        {
            Ok(exchange_order_id) => {
                let update = group.mark_leg_submitted(leg_id, exchange_order_id.clone())?;
                self.registry
                    .index_exchange_order(exchange_order_id.clone(), group.id().clone());
                record_leg_transition(update.role, update.current);
                tracing::info!(
                    group_id = %group.id(),
                    leg_id = %leg_id,
                    role = %role,
                    exchange_order_id = %exchange_order_id,
                    quantity = %request.quantity,
                    "Leg submitted"
                );
                Ok(())
            }
            Err(e) => {
                let reason = match &e {
                    AdapterError::Rejected { reason } => RejectReason::exchange_rejected(reason),
                    other => RejectReason::adapter_unavailable(other.to_string()),
                };
                tracing::warn!(
                    group_id = %group.id(),
                    leg_id = %leg_id,
                    role = %role,
                    reason = %reason.code,
                    error = %e,
                    "Leg submission rejected"
                );
                let update = group.reject_leg(leg_id, reason)?;
                record_leg_transition(update.role, update.current);
                queue.extend(CascadePolicy::on_leg_update(group, &update));
                Ok(())
            }
        }
    }

    pub(super) fn arm(&self, group: &OrderGroup, leg_id: &LegId) {
        let Some(leg) = group.leg(leg_id) else {
            return;
        };
        if leg.status() != LegStatus::Created {
            return;
        }
        let sibling = group
            .oco_sibling(leg_id)
            .filter(|s| s.is_trigger_held() && s.status() == LegStatus::Created)
            .map(|s| s.id().clone());
        let Some(condition) = leg.trigger_condition(sibling) else {
            tracing::warn!(leg_id = %leg_id, "Leg has no trigger to arm");
            return;
        };

        match self.evaluator.register(condition) {
            Ok(()) => tracing::info!(
                group_id = %group.id(),
                leg_id = %leg_id,
                role = %leg.role(),
                trigger_price = ?leg.trigger_price(),
                "Trigger armed"
            ),
            Err(TriggerEvaluationError::AlreadyRegistered { .. }) => {}
            Err(e) => tracing::error!(leg_id = %leg_id, error = %e, "Trigger could not be armed"),
        }
    }

    /// Cancel a leg. Local legs close in place; working legs are cancelled
    /// at the exchange first and close locally once acknowledged.
    async fn cancel(
        &self,
        group: &mut OrderGroup,
        leg_id: &LegId,
        reason: CancelReason,
    ) -> Result<(), EngineError> {
        let leg = group.leg(leg_id).ok_or_else(|| OrderGroupError::LegNotFound {
            leg_id: leg_id.clone(),
        })?;
        if leg.status().is_terminal() {
            return Ok(());
        }

        if leg.status().is_local() {
            self.evaluator.deregister(leg_id);
        } else if let Some(exchange_order_id) = leg.exchange_order_id().cloned() {
            with_retry(&self.retry, "cancel_leg", || {
                self.adapter.cancel_leg(&exchange_order_id)
            })
            .await?;
        }

        let update = group.cancel_leg(leg_id, reason.clone())?;
        record_leg_transition(update.role, update.current);
        if reason.is_cascade() {
            record_cascade(&reason.code);
        }
        tracing::info!(
            group_id = %group.id(),
            leg_id = %leg_id,
            role = %update.role,
            reason = %reason.code,
            "Leg cancelled"
        );
        Ok(())
    }

    /// Shrink an exit, amending the exchange order first when it is working.
    async fn resize(
        &self,
        group: &mut OrderGroup,
        leg_id: &LegId,
        quantity: Quantity,
    ) -> Result<(), EngineError> {
        let leg = group.leg(leg_id).ok_or_else(|| OrderGroupError::LegNotFound {
            leg_id: leg_id.clone(),
        })?;
        if leg.status().is_terminal() || quantity >= leg.ordered_quantity() {
            return Ok(());
        }
        let previous = leg.ordered_quantity();

        if let Some(exchange_order_id) = leg.exchange_order_id().cloned() {
            let request = ModifyOrderRequest::new(exchange_order_id).with_quantity(Some(quantity));
            with_retry(&self.retry, "resize_leg", || {
                self.adapter.modify_leg(request.clone())
            })
            .await?;
        }

        group.resize_exit(leg_id, quantity)?;
        tracing::info!(
            group_id = %group.id(),
            leg_id = %leg_id,
            previous = %previous,
            quantity = %quantity,
            "Exit resized to the open position"
        );
        Ok(())
    }

    async fn square_off(
        &self,
        group: &mut OrderGroup,
        reason: CancelReason,
    ) -> Result<(), EngineError> {
        let quantity = group.open_entry_position();
        if !quantity.is_positive() || group.square_off().is_some() {
            return Ok(());
        }

        let request = SquareOffRequest::for_group(group, quantity);
        let exchange_order_id = match with_retry(&self.retry, "square_off", || {
            self.adapter.square_off(request.clone())
        })
        .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    group_id = %group.id(),
                    quantity = %quantity,
                    error = %e,
                    "Square-off failed, entry position still open"
                );
                return Err(e.into());
            }
        };

        group.record_square_off(exchange_order_id.clone(), quantity, reason.clone())?;
        record_cascade(&reason.code);
        tracing::warn!(
            group_id = %group.id(),
            exchange_order_id = %exchange_order_id,
            quantity = %quantity,
            reason = %reason.code,
            "Entry position squared off"
        );
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save the group, append and publish its events, and retire it once
    /// terminal.
    pub(super) async fn commit(&self, group: &mut OrderGroup) -> Result<(), EngineError> {
        let events = group.drain_events();
        self.store.save_group(group).await?;
        if !events.is_empty() {
            let sequence = self.store.append_events(group.id(), &events).await?;
            tracing::debug!(group_id = %group.id(), sequence, count = events.len(), "Events appended");
            if let Err(e) = self.publisher.publish_group_events(events).await {
                tracing::error!(group_id = %group.id(), error = %e, "Failed to publish events");
            }
        }

        if group.is_terminal() {
            self.retire(group).await?;
        }
        Ok(())
    }

    async fn retire(&self, group: &OrderGroup) -> Result<(), EngineError> {
        let disarmed = self.evaluator.deregister_group(group.id());
        if self.registry.remove(group.id()).is_none() {
            return Ok(());
        }
        self.store.archive(group.id()).await?;
        record_group_closed(group.kind(), group.status());
        set_active_groups(self.registry.len());
        tracing::info!(
            group_id = %group.id(),
            status = %group.status(),
            filled_quantity = %group.filled_quantity(),
            reason = group.close_reason().map_or("", |r| r.code.as_str()),
            disarmed = disarmed.len(),
            "Order group closed"
        );
        Ok(())
    }
}
