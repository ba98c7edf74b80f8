//! Retry policy with exponential backoff for execution adapter calls.
//!
//! Transient failures (connection resets, timeouts, throttling) are retried
//! with a bounded, jittered backoff. Business outcomes (rejects, too late to
//! cancel, unknown order) are returned on the first attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! let policy = AdapterRetryPolicy::default();
//! let ack = with_retry(&policy, "submit_leg", || adapter.submit_leg(request.clone())).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::application::ports::AdapterError;
use crate::observability::record_adapter_retry;

/// Retry policy for execution adapter calls.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRetryPolicy {
    /// Maximum number of retries after the first attempt (default: 5).
    pub max_attempts: u32,
    /// Initial backoff duration (default: 100ms).
    pub initial_backoff: Duration,
    /// Maximum backoff duration (default: 30s).
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth (default: 2.0).
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (default: 0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for AdapterRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl AdapterRetryPolicy {
    /// Create a retry policy with custom settings.
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
            jitter_factor,
        }
    }
}

/// Calculator for exponential backoff with jitter.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    current_attempt: u32,
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Create a backoff calculator from a retry policy.
    #[must_use]
    pub const fn new(policy: &AdapterRetryPolicy) -> Self {
        Self {
            current_attempt: 0,
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Next backoff duration with jitter, or `None` once retries are spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let base_ms = self.base_backoff_ms();
        let capped_ms = self.apply_jitter(base_ms).min(self.max_backoff_ms);
        self.current_attempt += 1;

        Some(Duration::from_millis(capped_ms))
    }

    fn base_backoff_ms(&self) -> u64 {
        let multiplier = self.backoff_multiplier.powi(self.current_attempt as i32);
        let backoff = (self.initial_backoff_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms)
    }

    /// Random value in `[backoff * (1 - jitter), backoff * (1 + jitter)]`.
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 {
            return backoff_ms;
        }
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        rand::rng().random_range(min..=max) as u64
    }

    /// Retries handed out so far.
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Returns true if more retries are available.
    #[must_use]
    pub const fn has_remaining_attempts(&self) -> bool {
        self.current_attempt < self.max_attempts
    }
}

/// Run `call` until it succeeds, fails with a non-transient error, or the
/// policy runs out of retries.
///
/// # Errors
///
/// Returns the last error from `call`.
pub async fn with_retry<T, F, Fut>(
    policy: &AdapterRetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut backoff = ExponentialBackoffCalculator::new(policy);
    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_transient() {
            return Err(err);
        }
        let Some(delay) = backoff.next_backoff() else {
            tracing::warn!(
                operation,
                attempts = backoff.current_attempt() + 1,
                error = %err,
                "Adapter retries exhausted"
            );
            return Err(err);
        };

        record_adapter_retry(operation);
        tracing::debug!(
            operation,
            attempt = backoff.current_attempt(),
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying adapter call"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ExecutionAdapter, LegOrderRequest, ModifyOrderRequest, OpenOrder, SquareOffRequest,
    };
    use crate::domain::order_group::{OrderSide, OrderType, ProductType};
    use crate::domain::shared::{
        ClientId, Exchange, ExchangeOrderId, GroupId, InstrumentId, LegId, Quantity,
    };
    use async_trait::async_trait;
    use mockall::{Sequence, mock};

    mock! {
        Adapter {}

        #[async_trait]
        impl ExecutionAdapter for Adapter {
            async fn submit_leg(&self, request: LegOrderRequest) -> Result<ExchangeOrderId, AdapterError>;
            async fn cancel_leg(&self, exchange_order_id: &ExchangeOrderId) -> Result<(), AdapterError>;
            async fn modify_leg(&self, request: ModifyOrderRequest) -> Result<(), AdapterError>;
            async fn square_off(&self, request: SquareOffRequest) -> Result<ExchangeOrderId, AdapterError>;
            async fn open_orders(&self) -> Result<Vec<OpenOrder>, AdapterError>;
            async fn health_check(&self) -> Result<(), AdapterError>;
        }
    }

    fn fast_policy(max_attempts: u32) -> AdapterRetryPolicy {
        AdapterRetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(5),
            2.0,
            0.0,
        )
    }

    fn request() -> LegOrderRequest {
        LegOrderRequest {
            group_id: GroupId::new("grp-1"),
            leg_id: LegId::new("leg-1"),
            client_id: ClientId::new("AB1234"),
            instrument: InstrumentId::new("INFY"),
            exchange: Exchange::Nse,
            product: ProductType::Intraday,
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            price: None,
            trigger_price: None,
        }
    }

    #[test]
    fn default_policy() {
        let policy = AdapterRetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(30));
    }

    #[test]
    fn backoff_grows_exponentially_without_jitter() {
        let policy = AdapterRetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_secs(30),
            2.0,
            0.0,
        );
        let mut backoff = ExponentialBackoffCalculator::new(&policy);

        let delays: Vec<u128> = std::iter::from_fn(|| backoff.next_backoff())
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1600]);
        assert!(!backoff.has_remaining_attempts());
    }

    #[test]
    fn backoff_is_capped() {
        let policy = AdapterRetryPolicy::new(
            10,
            Duration::from_secs(1),
            Duration::from_secs(5),
            10.0,
            0.0,
        );
        let mut backoff = ExponentialBackoffCalculator::new(&policy);
        backoff.next_backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = AdapterRetryPolicy::new(
            1,
            Duration::from_millis(1000),
            Duration::from_secs(30),
            2.0,
            0.2,
        );
        for _ in 0..50 {
            let mut backoff = ExponentialBackoffCalculator::new(&policy);
            let ms = backoff.next_backoff().unwrap().as_millis();
            assert!((800..=1200).contains(&ms), "{ms}ms outside jitter range");
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let mut adapter = MockAdapter::new();
        let mut seq = Sequence::new();
        adapter
            .expect_submit_leg()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(AdapterError::ConnectionError {
                    message: "connection reset".to_string(),
                })
            });
        adapter
            .expect_submit_leg()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ExchangeOrderId::new("ex-1")));

        let req = request();
        let result = with_retry(&fast_policy(3), "submit_leg", || {
            adapter.submit_leg(req.clone())
        })
        .await;

        assert_eq!(result.unwrap(), ExchangeOrderId::new("ex-1"));
    }

    #[tokio::test]
    async fn business_reject_is_not_retried() {
        let mut adapter = MockAdapter::new();
        adapter.expect_submit_leg().times(1).returning(|_| {
            Err(AdapterError::Rejected {
                reason: "RMS: margin shortfall".to_string(),
            })
        });

        let req = request();
        let result = with_retry(&fast_policy(5), "submit_leg", || {
            adapter.submit_leg(req.clone())
        })
        .await;

        assert!(matches!(result, Err(AdapterError::Rejected { .. })));
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_cancel_leg()
            .times(3)
            .returning(|_| Err(AdapterError::RateLimited));

        let ex = ExchangeOrderId::new("ex-1");
        let result = with_retry(&fast_policy(2), "cancel_leg", || adapter.cancel_leg(&ex)).await;

        assert_eq!(result, Err(AdapterError::RateLimited));
    }

    #[tokio::test]
    async fn too_late_to_cancel_returns_immediately() {
        let mut adapter = MockAdapter::new();
        adapter.expect_cancel_leg().times(1).returning(|id| {
            Err(AdapterError::TooLateToCancel {
                exchange_order_id: id.clone(),
            })
        });

        let ex = ExchangeOrderId::new("ex-7");
        let result = with_retry(&fast_policy(5), "cancel_leg", || adapter.cancel_leg(&ex)).await;

        assert!(matches!(result, Err(AdapterError::TooLateToCancel { .. })));
    }
}
