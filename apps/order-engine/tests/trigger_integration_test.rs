//! Trigger, background service and recovery integration tests

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Engine, bracket, eventually, gtt, gtt_oco};
use order_engine::application::services::{ExecutionListener, ExpirySweeper, TickPump};
use order_engine::domain::order_group::{
    CreateGroupCommand, GroupParams, GroupStatus, LegModification, LegRole, LegStatus, OrderSide,
};
use order_engine::domain::shared::{Price, Timestamp};
use order_engine::domain::triggers::{Tick, TriggerOperator};
use order_engine::infrastructure::execution::PaperExecutionAdapter;
use order_engine::infrastructure::market_data::MockMarketData;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn trailing_sell_gtt(trigger: i64, offset: Decimal) -> CreateGroupCommand {
    let mut cmd = gtt(OrderSide::Sell, TriggerOperator::AtOrBelow, trigger);
    if let GroupParams::Gtt { trigger, .. } = &mut cmd.params {
        trigger.trailing_offset = Some(offset);
    }
    cmd
}

// =============================================================================
// Trailing Stops
// =============================================================================

#[tokio::test]
async fn trailing_gtt_follows_the_price_and_fires_once() {
    let engine = Engine::new();
    let group_id = engine
        .coordinator
        .create_group(trailing_sell_gtt(95, dec!(2)))
        .await
        .unwrap();

    let moved = engine
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(101)))
        .await
        .unwrap();
    assert!(moved.fired.is_empty());
    assert_eq!(moved.adjusted[0].current, Price::from_i64(99));
    let entry = engine.snapshot(&group_id).await;
    assert_eq!(
        entry.leg(LegRole::Entry).unwrap().trigger_price,
        Some(Price::from_i64(99).amount())
    );

    // A falling price never loosens the stop.
    let held = engine
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(100)))
        .await
        .unwrap();
    assert!(held.adjusted.is_empty());

    let fired = engine
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(99)))
        .await
        .unwrap();
    assert_eq!(fired.fired.len(), 1);
    assert_eq!(fired.fired[0].trigger_price, Price::from_i64(99));

    let again = engine
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(98)))
        .await
        .unwrap();
    assert!(again.fired.is_empty());
    assert_eq!(engine.adapter.submissions().len(), 1);
    assert_eq!(
        engine.snapshot(&group_id).await.leg(LegRole::Entry).unwrap().status,
        LegStatus::Submitted
    );
}

#[tokio::test]
async fn non_positive_tick_leaves_triggers_armed() {
    let engine = Engine::new();
    engine
        .coordinator
        .create_group(gtt(OrderSide::Buy, TriggerOperator::AtOrBelow, 1_400))
        .await
        .unwrap();

    let result = engine
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(0)))
        .await;

    assert!(result.is_err());
    assert_eq!(engine.coordinator.evaluator().registered_count(), 1);
    assert!(engine.adapter.submissions().is_empty());
}

#[tokio::test]
async fn modifying_an_armed_trigger_rearms_it() {
    let engine = Engine::new();
    let group_id = engine
        .coordinator
        .create_group(gtt(OrderSide::Buy, TriggerOperator::AtOrBelow, 1_400))
        .await
        .unwrap();

    engine
        .coordinator
        .modify_leg(
            &group_id,
            LegRole::Entry,
            LegModification {
                trigger_price: Some(Price::from_i64(1_450)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let evaluation = engine
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(1_440)))
        .await
        .unwrap();
    assert_eq!(evaluation.fired.len(), 1);
}

// =============================================================================
// Background Services
// =============================================================================

#[tokio::test]
async fn tick_pump_and_listener_drive_an_oco_to_completion() {
    let (adapter, reports) = PaperExecutionAdapter::with_report_channel(64);
    let engine = Engine::with_adapter(adapter);
    let market = Arc::new(MockMarketData::new());
    let shutdown = CancellationToken::new();

    let listener =
        ExecutionListener::new(Arc::clone(&engine.coordinator), reports, shutdown.clone()).spawn();
    let pump = TickPump::new(
        Arc::clone(&engine.coordinator),
        Arc::clone(&market),
        Duration::from_millis(10),
        shutdown.clone(),
    )
    .spawn();

    let group_id = engine
        .coordinator
        .create_group(gtt_oco(1_600, 1_400))
        .await
        .unwrap();
    market.set_price("INFY", Price::from_i64(1_610));

    let adapter = Arc::clone(&engine.adapter);
    assert!(
        eventually(|| {
            let adapter = Arc::clone(&adapter);
            async move { adapter.submissions().len() == 1 }
        })
        .await,
        "upper leg was never submitted"
    );
    engine.exchange_fill(&group_id, LegRole::OcoA).await;

    let coordinator = Arc::clone(&engine.coordinator);
    let id = group_id.clone();
    assert!(
        eventually(|| {
            let coordinator = Arc::clone(&coordinator);
            let id = id.clone();
            async move {
                coordinator
                    .fetch_group(&id)
                    .await
                    .is_ok_and(|s| s.status == GroupStatus::Completed)
            }
        })
        .await,
        "group never completed"
    );

    shutdown.cancel();
    tokio_test::assert_ok!(listener.await);
    tokio_test::assert_ok!(pump.await);
}

#[tokio::test]
async fn tick_pump_skips_instruments_without_prices() {
    let engine = Engine::new();
    let market = Arc::new(MockMarketData::new());
    engine
        .coordinator
        .create_group(gtt(OrderSide::Buy, TriggerOperator::AtOrBelow, 1_400))
        .await
        .unwrap();

    let pump = TickPump::new(
        Arc::clone(&engine.coordinator),
        Arc::clone(&market),
        Duration::from_millis(10),
        CancellationToken::new(),
    );

    assert_eq!(pump.poll_once().await, 0);
    market.set_price("INFY", Price::from_i64(1_390));
    assert_eq!(pump.poll_once().await, 1);
    assert_eq!(pump.poll_once().await, 0);
}

#[tokio::test]
async fn expiry_sweeper_closes_due_groups() {
    let engine = Engine::new();
    let mut cmd = gtt(OrderSide::Buy, TriggerOperator::AtOrBelow, 1_400);
    cmd.expires_at = Some(Timestamp::now().plus(chrono::Duration::milliseconds(50)));
    let group_id = engine.coordinator.create_group(cmd).await.unwrap();

    let shutdown = CancellationToken::new();
    let sweeper = ExpirySweeper::new(
        Arc::clone(&engine.coordinator),
        Duration::from_millis(10),
        shutdown.clone(),
    )
    .spawn();

    let coordinator = Arc::clone(&engine.coordinator);
    assert!(
        eventually(|| {
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.active_groups() == 0 }
        })
        .await
    );
    let snapshot = engine.snapshot(&group_id).await;
    assert_eq!(snapshot.status, GroupStatus::Cancelled);
    assert_eq!(snapshot.close_reason.as_deref(), Some("EXPIRED"));

    shutdown.cancel();
    tokio_test::assert_ok!(sweeper.await);
}

// =============================================================================
// Recovery
// =============================================================================

#[tokio::test]
async fn recovery_rearms_triggers_and_reports_missing_orders() {
    let before = Engine::new();
    let gtt_id = before
        .coordinator
        .create_group(gtt(OrderSide::Buy, TriggerOperator::AtOrBelow, 1_400))
        .await
        .unwrap();
    let bracket_id = before.coordinator.create_group(bracket(10)).await.unwrap();

    // The entry disappears at the exchange while the engine is down.
    let entry = before.leg_id(&bracket_id, LegRole::Entry).await;
    let order = before.adapter.order_for_leg(&entry).unwrap();
    before.adapter.exchange_cancel(&order).unwrap();

    let after = before.restarted();
    let report = after.coordinator.recover().await.unwrap();

    assert_eq!(report.recovered_groups, 2);
    assert_eq!(report.armed_triggers, 1);
    assert!(report.open_orders_checked);
    assert_eq!(report.missing_at_exchange, vec![(bracket_id, entry)]);
    assert_eq!(after.coordinator.active_groups(), 2);

    let evaluation = after
        .coordinator
        .on_market_tick(&Tick::now("INFY", Price::from_i64(1_390)))
        .await
        .unwrap();
    assert_eq!(evaluation.fired[0].group_id, gtt_id);
}

#[tokio::test]
async fn recovery_is_idempotent() {
    let engine = Engine::new();
    engine
        .coordinator
        .create_group(gtt(OrderSide::Buy, TriggerOperator::AtOrBelow, 1_400))
        .await
        .unwrap();

    let report = engine.coordinator.recover().await.unwrap();

    assert_eq!(report.recovered_groups, 0);
    assert_eq!(engine.coordinator.evaluator().registered_count(), 1);
}
