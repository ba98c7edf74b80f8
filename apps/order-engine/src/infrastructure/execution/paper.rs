//! Paper execution adapter.
//!
//! Accepts every order and keeps it working until the caller scripts what
//! happens next: fills, partial fills, rejects or exchange-side cancels.
//! Each scripted event is returned as an `ExecutionReport` and, when a
//! report channel is attached, also sent on it.
//!
//! Cancelling a filled order answers `TooLateToCancel`, so fill-wins races
//! can be reproduced deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::ports::{
    AdapterError, ExecutionAdapter, LegOrderRequest, ModifyOrderRequest, OpenOrder,
    SquareOffRequest,
};
use crate::domain::order_group::{ExecutionKind, ExecutionReport, RejectReason};
use crate::domain::shared::{ExchangeOrderId, LegId, Price, Quantity};

/// State of a paper order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperOrderState {
    /// Working at the simulated exchange.
    Open,
    /// Completely filled.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Rejected after acceptance.
    Rejected,
}

/// An order held by the paper adapter.
#[derive(Debug, Clone)]
pub struct PaperOrder {
    /// Request as submitted (price and quantity reflect later modifications).
    pub request: LegOrderRequest,
    /// Quantity filled so far.
    pub filled: Quantity,
    /// Current state.
    pub state: PaperOrderState,
}

impl PaperOrder {
    fn pending(&self) -> Quantity {
        self.request.quantity.saturating_sub(self.filled)
    }
}

/// Scriptable in-process execution adapter.
#[derive(Debug, Default)]
pub struct PaperExecutionAdapter {
    orders: Mutex<HashMap<ExchangeOrderId, PaperOrder>>,
    submissions: Mutex<Vec<(ExchangeOrderId, LegOrderRequest)>>,
    square_offs: Mutex<Vec<(ExchangeOrderId, SquareOffRequest)>>,
    failures: Mutex<VecDeque<AdapterError>>,
    next_order: AtomicU64,
    next_event: AtomicU64,
    offline: AtomicBool,
    reports: Option<mpsc::Sender<ExecutionReport>>,
}

impl PaperExecutionAdapter {
    /// Adapter that only returns scripted reports to the caller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter that also streams every report on a bounded channel.
    #[must_use]
    pub fn with_report_channel(capacity: usize) -> (Self, mpsc::Receiver<ExecutionReport>) {
        let (tx, rx) = mpsc::channel(capacity);
        let adapter = Self {
            reports: Some(tx),
            ..Self::default()
        };
        (adapter, rx)
    }

    /// Fail the next adapter call with `error`. Queued failures are consumed
    /// in order, one per call.
    pub fn fail_next(&self, error: AdapterError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Make `health_check` fail while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Exchange order carrying `leg_id`, most recent first.
    #[must_use]
    pub fn order_for_leg(&self, leg_id: &LegId) -> Option<ExchangeOrderId> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(_, request)| &request.leg_id == leg_id)
            .map(|(id, _)| id.clone())
    }

    /// A paper order.
    #[must_use]
    pub fn order(&self, exchange_order_id: &ExchangeOrderId) -> Option<PaperOrder> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(exchange_order_id)
            .cloned()
    }

    /// Every accepted submission in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<LegOrderRequest> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Every square-off issued.
    #[must_use]
    pub fn square_offs(&self) -> Vec<SquareOffRequest> {
        self.square_offs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Number of working orders.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|o| o.state == PaperOrderState::Open)
            .count()
    }

    // ========================================================================
    // Scripted Exchange Events
    // ========================================================================

    /// Fill the rest of an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order is unknown or no longer open.
    pub fn fill(
        &self,
        exchange_order_id: &ExchangeOrderId,
        price: Option<Price>,
    ) -> Result<ExecutionReport, AdapterError> {
        self.update_open(exchange_order_id, |order| {
            order.filled = order.request.quantity;
            order.state = PaperOrderState::Filled;
        })?;
        Ok(self.emit(exchange_order_id, ExecutionKind::Filled { price }))
    }

    /// Fill part of an order; fills the rest when `quantity` covers it.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order is unknown or no longer open.
    pub fn partial_fill(
        &self,
        exchange_order_id: &ExchangeOrderId,
        quantity: Quantity,
        price: Option<Price>,
    ) -> Result<ExecutionReport, AdapterError> {
        self.update_open(exchange_order_id, |order| {
            order.filled = (order.filled + quantity).min(order.request.quantity);
            if order.pending().is_zero() {
                order.state = PaperOrderState::Filled;
            }
        })?;
        Ok(self.emit(
            exchange_order_id,
            ExecutionKind::PartialFill { quantity, price },
        ))
    }

    /// Reject a working order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order is unknown or no longer open.
    pub fn reject(
        &self,
        exchange_order_id: &ExchangeOrderId,
        message: &str,
    ) -> Result<ExecutionReport, AdapterError> {
        self.update_open(exchange_order_id, |order| {
            order.state = PaperOrderState::Rejected;
        })?;
        Ok(self.emit(
            exchange_order_id,
            ExecutionKind::Rejected {
                reason: RejectReason::exchange_rejected(message),
            },
        ))
    }

    /// Cancel an order from the exchange side (e.g. end of session).
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order is unknown or no longer open.
    pub fn exchange_cancel(
        &self,
        exchange_order_id: &ExchangeOrderId,
    ) -> Result<ExecutionReport, AdapterError> {
        self.update_open(exchange_order_id, |order| {
            order.state = PaperOrderState::Cancelled;
        })?;
        Ok(self.emit(exchange_order_id, ExecutionKind::CancelledAck))
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn take_failure(&self) -> Result<(), AdapterError> {
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_order_id(&self, prefix: &str) -> ExchangeOrderId {
        let n = self.next_order.fetch_add(1, Ordering::SeqCst) + 1;
        ExchangeOrderId::new(format!("{prefix}-{n:06}"))
    }

    fn update_open(
        &self,
        exchange_order_id: &ExchangeOrderId,
        apply: impl FnOnce(&mut PaperOrder),
    ) -> Result<(), AdapterError> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        let order = orders
            .get_mut(exchange_order_id)
            .filter(|o| o.state == PaperOrderState::Open)
            .ok_or_else(|| AdapterError::OrderNotFound {
                exchange_order_id: exchange_order_id.clone(),
            })?;
        apply(order);
        Ok(())
    }

    fn emit(&self, exchange_order_id: &ExchangeOrderId, kind: ExecutionKind) -> ExecutionReport {
        let n = self.next_event.fetch_add(1, Ordering::SeqCst) + 1;
        let report = ExecutionReport::new(format!("paper-evt-{n}"), exchange_order_id.clone(), kind);
        if let Some(tx) = &self.reports {
            if let Err(e) = tx.try_send(report.clone()) {
                tracing::warn!(
                    exchange_order_id = %exchange_order_id,
                    error = %e,
                    "Paper execution report dropped"
                );
            }
        }
        report
    }
}

#[async_trait]
impl ExecutionAdapter for PaperExecutionAdapter {
    async fn submit_leg(&self, request: LegOrderRequest) -> Result<ExchangeOrderId, AdapterError> {
        self.take_failure()?;
        let exchange_order_id = self.next_order_id("PAPER");
        tracing::debug!(
            exchange_order_id = %exchange_order_id,
            leg_id = %request.leg_id,
            side = %request.side,
            quantity = %request.quantity,
            "Paper order accepted"
        );
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                exchange_order_id.clone(),
                PaperOrder {
                    request: request.clone(),
                    filled: Quantity::ZERO,
                    state: PaperOrderState::Open,
                },
            );
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((exchange_order_id.clone(), request));
        Ok(exchange_order_id)
    }

    async fn cancel_leg(&self, exchange_order_id: &ExchangeOrderId) -> Result<(), AdapterError> {
        self.take_failure()?;
        {
            let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
            let order =
                orders
                    .get_mut(exchange_order_id)
                    .ok_or_else(|| AdapterError::OrderNotFound {
                        exchange_order_id: exchange_order_id.clone(),
                    })?;
            match order.state {
                PaperOrderState::Filled => {
                    return Err(AdapterError::TooLateToCancel {
                        exchange_order_id: exchange_order_id.clone(),
                    });
                }
                PaperOrderState::Cancelled | PaperOrderState::Rejected => return Ok(()),
                PaperOrderState::Open => order.state = PaperOrderState::Cancelled,
            }
        }
        self.emit(exchange_order_id, ExecutionKind::CancelledAck);
        Ok(())
    }

    async fn modify_leg(&self, request: ModifyOrderRequest) -> Result<(), AdapterError> {
        self.take_failure()?;
        let exchange_order_id = request.exchange_order_id.clone();
        self.update_open(&exchange_order_id, |order| {
            if let Some(price) = request.price {
                order.request.price = Some(price);
            }
            if let Some(trigger) = request.trigger_price {
                order.request.trigger_price = Some(trigger);
            }
            if let Some(quantity) = request.quantity {
                order.request.quantity = quantity;
            }
        })
    }

    async fn square_off(&self, request: SquareOffRequest) -> Result<ExchangeOrderId, AdapterError> {
        self.take_failure()?;
        let exchange_order_id = self.next_order_id("PAPER-SQ");
        tracing::debug!(
            exchange_order_id = %exchange_order_id,
            group_id = %request.group_id,
            quantity = %request.quantity,
            "Paper square-off executed"
        );
        self.square_offs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((exchange_order_id.clone(), request));
        Ok(exchange_order_id)
    }

    async fn open_orders(&self) -> Result<Vec<OpenOrder>, AdapterError> {
        self.take_failure()?;
        let orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(orders
            .iter()
            .filter(|(_, o)| o.state == PaperOrderState::Open)
            .map(|(id, o)| OpenOrder {
                exchange_order_id: id.clone(),
                instrument: o.request.instrument.clone(),
                pending_quantity: o.pending(),
            })
            .collect())
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AdapterError::ConnectionError {
                message: "paper exchange offline".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_group::{OrderSide, OrderType, ProductType};
    use crate::domain::shared::{ClientId, Exchange, GroupId, InstrumentId};

    fn request(leg: &str) -> LegOrderRequest {
        LegOrderRequest {
            group_id: GroupId::new("grp-1"),
            leg_id: LegId::new(leg),
            client_id: ClientId::new("AB1234"),
            instrument: InstrumentId::new("INFY"),
            exchange: Exchange::Nse,
            product: ProductType::Intraday,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Quantity::from_i64(10),
            price: Some(Price::from_i64(1_500)),
            trigger_price: None,
        }
    }

    #[tokio::test]
    async fn cancel_after_fill_is_too_late() {
        let adapter = PaperExecutionAdapter::new();
        let id = adapter.submit_leg(request("leg-1")).await.unwrap();
        adapter.fill(&id, None).unwrap();

        let err = adapter.cancel_leg(&id).await.unwrap_err();
        assert!(matches!(err, AdapterError::TooLateToCancel { .. }));
    }

    #[tokio::test]
    async fn partial_fills_accumulate() {
        let adapter = PaperExecutionAdapter::new();
        let id = adapter.submit_leg(request("leg-1")).await.unwrap();

        adapter
            .partial_fill(&id, Quantity::from_i64(4), None)
            .unwrap();
        let open = adapter.open_orders().await.unwrap();
        assert_eq!(open[0].pending_quantity, Quantity::from_i64(6));

        adapter
            .partial_fill(&id, Quantity::from_i64(6), None)
            .unwrap();
        assert_eq!(adapter.order(&id).unwrap().state, PaperOrderState::Filled);
        assert_eq!(adapter.open_count(), 0);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let adapter = PaperExecutionAdapter::new();
        adapter.fail_next(AdapterError::Timeout {
            message: "slow".to_string(),
        });

        assert!(adapter.submit_leg(request("leg-1")).await.is_err());
        assert!(adapter.submit_leg(request("leg-1")).await.is_ok());
    }

    #[tokio::test]
    async fn reports_are_streamed_when_a_channel_is_attached() {
        let (adapter, mut rx) = PaperExecutionAdapter::with_report_channel(8);
        let id = adapter.submit_leg(request("leg-1")).await.unwrap();

        let report = adapter.fill(&id, Some(Price::from_i64(1_499))).unwrap();
        let streamed = rx.recv().await.unwrap();
        assert_eq!(streamed, report);
        assert_eq!(adapter.order_for_leg(&LegId::new("leg-1")), Some(id));
    }

    #[tokio::test]
    async fn events_on_closed_orders_are_refused() {
        let adapter = PaperExecutionAdapter::new();
        let id = adapter.submit_leg(request("leg-1")).await.unwrap();
        adapter.cancel_leg(&id).await.unwrap();

        assert!(adapter.fill(&id, None).is_err());
        assert!(adapter.cancel_leg(&id).await.is_ok());
    }
}
