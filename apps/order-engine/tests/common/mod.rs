//! Shared harness for the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use order_engine::application::dto::GroupSnapshotDto;
use order_engine::application::services::{
    AdapterRetryPolicy, LegOrderCoordinator, TriggerEvaluator,
};
use order_engine::domain::order_group::{
    CreateGroupCommand, ExecutionReport, GroupParams, GttOcoLegSpec, GttTriggerSpec, LegRole,
    OrderPricing, OrderSide, ProductType, SpreadLegSpec, StopLossSpec,
};
use order_engine::domain::shared::{ClientId, Exchange, GroupId, InstrumentId, LegId, Price, Quantity};
use order_engine::domain::triggers::TriggerOperator;
use order_engine::infrastructure::execution::PaperExecutionAdapter;
use order_engine::infrastructure::persistence::InMemoryOrderStore;
use order_engine::infrastructure::publisher::BroadcastEventPublisher;
use rust_decimal::Decimal;

pub type PaperCoordinator =
    LegOrderCoordinator<PaperExecutionAdapter, InMemoryOrderStore, BroadcastEventPublisher>;

pub struct Engine {
    pub coordinator: Arc<PaperCoordinator>,
    pub adapter: Arc<PaperExecutionAdapter>,
    pub store: Arc<InMemoryOrderStore>,
    pub publisher: Arc<BroadcastEventPublisher>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_adapter(PaperExecutionAdapter::new())
    }

    pub fn with_adapter(adapter: PaperExecutionAdapter) -> Self {
        Self::assemble(Arc::new(adapter), Arc::new(InMemoryOrderStore::new()))
    }

    /// A second engine over the same adapter and store, as after a restart.
    pub fn restarted(&self) -> Self {
        Self::assemble(Arc::clone(&self.adapter), Arc::clone(&self.store))
    }

    fn assemble(adapter: Arc<PaperExecutionAdapter>, store: Arc<InMemoryOrderStore>) -> Self {
        let publisher = Arc::new(BroadcastEventPublisher::new(256));
        let coordinator = LegOrderCoordinator::new(
            Arc::clone(&adapter),
            Arc::clone(&store),
            Arc::clone(&publisher),
            Arc::new(TriggerEvaluator::default()),
        )
        .with_retry_policy(fast_retry());
        Self {
            coordinator: Arc::new(coordinator),
            adapter,
            store,
            publisher,
        }
    }

    pub async fn snapshot(&self, group_id: &GroupId) -> GroupSnapshotDto {
        self.coordinator.fetch_group(group_id).await.unwrap()
    }

    pub async fn leg_id(&self, group_id: &GroupId, role: LegRole) -> LegId {
        let snapshot = self.snapshot(group_id).await;
        LegId::new(snapshot.leg(role).unwrap().leg_id.clone())
    }

    /// Fill at the exchange without delivering the report.
    pub async fn exchange_fill(&self, group_id: &GroupId, role: LegRole) -> ExecutionReport {
        let leg_id = self.leg_id(group_id, role).await;
        let order = self.adapter.order_for_leg(&leg_id).unwrap();
        self.adapter.fill(&order, None).unwrap()
    }

    pub async fn fill(&self, group_id: &GroupId, role: LegRole) {
        let report = self.exchange_fill(group_id, role).await;
        self.coordinator.on_execution_report(report).await.unwrap();
    }

    pub async fn partial_fill(&self, group_id: &GroupId, role: LegRole, quantity: i64) {
        let leg_id = self.leg_id(group_id, role).await;
        let order = self.adapter.order_for_leg(&leg_id).unwrap();
        let report = self
            .adapter
            .partial_fill(&order, Quantity::from_i64(quantity), None)
            .unwrap();
        self.coordinator.on_execution_report(report).await.unwrap();
    }
}

pub fn fast_retry() -> AdapterRetryPolicy {
    AdapterRetryPolicy::new(
        2,
        Duration::from_millis(1),
        Duration::from_millis(2),
        2.0,
        0.0,
    )
}

pub fn qty(value: i64) -> Decimal {
    Quantity::from_i64(value).amount()
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// =============================================================================
// Commands
// =============================================================================

pub fn command(quantity: i64, params: GroupParams) -> CreateGroupCommand {
    CreateGroupCommand {
        client_id: ClientId::new("AB1234"),
        instrument: InstrumentId::new("INFY"),
        exchange: Exchange::Nse,
        product: ProductType::Intraday,
        side: OrderSide::Buy,
        quantity: Quantity::from_i64(quantity),
        expires_at: None,
        params,
    }
}

pub fn bracket(quantity: i64) -> CreateGroupCommand {
    command(
        quantity,
        GroupParams::Bracket {
            entry: OrderPricing::limit(Price::from_i64(100)),
            target_price: Price::from_i64(110),
            stop_loss: StopLossSpec {
                trigger_price: Price::from_i64(95),
                limit_price: None,
                trailing_offset: None,
            },
        },
    )
}

pub fn cover(quantity: i64) -> CreateGroupCommand {
    command(
        quantity,
        GroupParams::Cover {
            entry: OrderPricing::limit(Price::from_i64(100)),
            stop_loss: StopLossSpec {
                trigger_price: Price::from_i64(95),
                limit_price: None,
                trailing_offset: None,
            },
        },
    )
}

pub fn spread(quantity: i64) -> CreateGroupCommand {
    let mut cmd = command(
        quantity,
        GroupParams::Spread {
            near: OrderPricing::limit(Price::from_i64(100)),
            far: SpreadLegSpec {
                instrument: InstrumentId::new("INFY-FUT"),
                side: OrderSide::Sell,
                pricing: OrderPricing::limit(Price::from_i64(102)),
            },
        },
    );
    cmd.exchange = Exchange::Nfo;
    cmd.product = ProductType::Normal;
    cmd
}

pub fn gtt(side: OrderSide, operator: TriggerOperator, trigger: i64) -> CreateGroupCommand {
    let mut cmd = command(
        10,
        GroupParams::Gtt {
            trigger: GttTriggerSpec {
                operator,
                trigger_price: Price::from_i64(trigger),
                trailing_offset: None,
            },
            pricing: OrderPricing::market(),
        },
    );
    cmd.side = side;
    cmd.product = ProductType::Delivery;
    cmd
}

pub fn gtt_oco(upper: i64, lower: i64) -> CreateGroupCommand {
    let mut cmd = command(
        10,
        GroupParams::GttOco {
            upper: GttOcoLegSpec {
                trigger_price: Price::from_i64(upper),
                pricing: OrderPricing::limit(Price::from_i64(upper)),
            },
            lower: GttOcoLegSpec {
                trigger_price: Price::from_i64(lower),
                pricing: OrderPricing::market(),
            },
        },
    );
    cmd.side = OrderSide::Sell;
    cmd.product = ProductType::Delivery;
    cmd
}

pub fn iceberg(quantity: i64, disclose: i64) -> CreateGroupCommand {
    command(
        quantity,
        GroupParams::Iceberg {
            disclose_quantity: Quantity::from_i64(disclose),
            pricing: OrderPricing::limit(Price::from_i64(100)),
        },
    )
}
