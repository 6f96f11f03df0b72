mod common;

use chrono::Utc;

use fusion_trading_bot::aggregator::SignalAggregator;
use fusion_trading_bot::analyzers::build_registry;
use fusion_trading_bot::error::StateError;
use fusion_trading_bot::exchange::{CandleProvider, Exchange, SimCandleProvider, SimExchange};
use fusion_trading_bot::filters::trend_confirmation::window_trend;
use fusion_trading_bot::filters::{ChainOutcome, FilterChain, FilterContext};
use fusion_trading_bot::models::{Direction, ExitType, SignalDirection, TradeStatus};
use fusion_trading_bot::risk::RiskSizer;
use fusion_trading_bot::trading::journal::TradeJournal;
use fusion_trading_bot::trading::lifecycle::TradeLifecycleManager;
use fusion_trading_bot::trading::reconcile;

use common::{make_bearish_trend, make_bullish_trend, test_config};

/// The whole decision pipeline, end to end: analyzers fire on a trending
/// market, the aggregate survives the filter chain, the sizer produces a
/// plan, and the lifecycle walks the position through the full ladder.
#[tokio::test]
async fn bullish_market_flows_from_signals_to_closed_trade() {
    let cfg = test_config();

    let mut provider = SimCandleProvider::new();
    let series = make_bullish_trend(60, 100.0);
    let current_price = series.last().unwrap().close;
    provider.load_uniform(&cfg.symbol, series);
    provider.load_uniform(&cfg.reference_symbol, make_bullish_trend(60, 2000.0));

    let mut exchange = SimExchange::new();
    exchange.set_price(&cfg.symbol, current_price);

    // Signals and fusion.
    let mut registry = build_registry(&cfg.symbol, &cfg.analyzers).unwrap();
    let window = provider
        .load_candles(&cfg.symbol, cfg.min_candles)
        .await
        .unwrap();
    let cycle = registry.evaluate(&cfg.symbol, window.m15.as_slice());
    assert_eq!(cycle.absent, 0);

    // Gate each fired direction before fusion.
    let reference = provider
        .load_candles(&cfg.reference_symbol, cfg.min_candles)
        .await
        .unwrap();
    let funding_rate = exchange.funding_rate(&cfg.symbol).await.unwrap();
    let reference_trend = window_trend(reference.m15.as_slice());
    let chain = FilterChain::from_settings(&cfg.filters);
    let gated = chain.gate(&cycle.signals, |direction| FilterContext {
        direction,
        candles: window.m15.as_slice(),
        current_price,
        funding_rate,
        reference_trend,
    });
    assert!(!gated.signals.is_empty());

    let decision = SignalAggregator::new(cfg.aggregator.clone()).aggregate(&gated.signals);
    assert_eq!(decision.direction, SignalDirection::Long);
    let confidence = decision.confidence;
    assert!(confidence >= cfg.aggregator.min_confidence_threshold);
    let direction = decision.direction.to_direction().unwrap();

    // Sizing and entry.
    let sizer = RiskSizer::new(cfg.risk.clone(), cfg.take_profit_levels.clone()).unwrap();
    let step = exchange.min_qty_step(&cfg.symbol).await.unwrap();
    let plan = sizer.size(direction, current_price, step).unwrap();
    assert!(plan.stop_loss_price < plan.entry_price);

    let mut manager = TradeLifecycleManager::new(
        &cfg.symbol,
        cfg.lifecycle.clone(),
        TradeJournal::in_memory(),
    );
    manager
        .begin_open(direction, &plan, confidence, Utc::now())
        .unwrap();
    let ack = exchange
        .place_entry_order(&cfg.symbol, direction, plan.quantity)
        .await
        .unwrap();
    let entry_price = manager.confirm_open(ack.fill_price).unwrap().entry_price;

    // Price sweeps the entire ladder: every level fills and the trade
    // closes as a take-profit with positive realized PnL.
    let fee_rate = exchange.fee_rate().await.unwrap();
    let closed = manager
        .on_price_update(entry_price * 1.05, fee_rate, Utc::now())
        .unwrap()
        .expect("a full ladder sweep closes the trade");

    assert_eq!(closed.status, TradeStatus::Closed);
    assert_eq!(closed.partial_fills.len(), 3);
    let exit = closed.exit.as_ref().unwrap();
    assert_eq!(exit.exit_type, ExitType::TakeProfit(3));
    assert!(exit.realized_pnl > 0.0);
    assert!(!manager.has_open_position());
    assert_eq!(manager.journal().read_all().len(), 1);
}

#[tokio::test]
async fn long_entry_into_bearish_market_is_blocked() {
    let cfg = test_config();
    let series = make_bearish_trend(60, 5000.0);
    let current_price = series.last().unwrap().close;

    let ctx = FilterContext {
        direction: Direction::Long,
        candles: series.as_slice(),
        current_price,
        funding_rate: None,
        reference_trend: None,
    };
    let chain = FilterChain::from_settings(&cfg.filters);
    match chain.run(&ctx) {
        ChainOutcome::Blocked { filter, .. } => assert_eq!(filter, "trend_confirmation"),
        other => panic!("expected a block, got {:?}", other),
    }
}

#[test]
fn second_entry_while_open_violates_the_state_machine() {
    let cfg = test_config();
    let sizer = RiskSizer::new(cfg.risk.clone(), cfg.take_profit_levels.clone()).unwrap();
    let plan = sizer.size(Direction::Long, 100.0, 0.001).unwrap();

    let mut manager = TradeLifecycleManager::new(
        &cfg.symbol,
        cfg.lifecycle.clone(),
        TradeJournal::in_memory(),
    );
    manager
        .begin_open(Direction::Long, &plan, 70.0, Utc::now())
        .unwrap();
    manager.confirm_open(100.0).unwrap();

    let second = manager.begin_open(Direction::Short, &plan, 70.0, Utc::now());
    assert!(matches!(
        second,
        Err(StateError::PositionAlreadyOpen { .. })
    ));
    // The open position is untouched by the refused attempt.
    assert!(manager.has_open_position());
}

/// A restart resumes the open position from the on-disk journal and keeps
/// managing it to its close.
#[test]
fn restart_resumes_open_position_from_journal() {
    let cfg = test_config();
    let path = std::env::temp_dir().join(format!(
        "fusion_integration_{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let sizer = RiskSizer::new(cfg.risk.clone(), cfg.take_profit_levels.clone()).unwrap();
    let plan = sizer.size(Direction::Long, 100.0, 0.001).unwrap();

    {
        let journal = TradeJournal::open(&path).unwrap();
        let mut manager =
            TradeLifecycleManager::new(&cfg.symbol, cfg.lifecycle.clone(), journal);
        manager
            .begin_open(Direction::Long, &plan, 70.0, Utc::now())
            .unwrap();
        manager.confirm_open(100.0).unwrap();
    }

    // "Restart": a fresh manager over the same journal file.
    let journal = TradeJournal::open(&path).unwrap();
    let mut manager = TradeLifecycleManager::new(&cfg.symbol, cfg.lifecycle.clone(), journal);
    assert!(manager.has_open_position());

    let closed = manager
        .on_price_update(97.0, 0.0, Utc::now())
        .unwrap()
        .expect("price through the stop closes the resumed trade");
    assert_eq!(closed.exit.as_ref().unwrap().exit_type, ExitType::StopLoss);

    let reloaded = TradeJournal::open(&path).unwrap();
    assert_eq!(reloaded.read_all().len(), 1);
    assert_eq!(reloaded.read_all()[0].status, TradeStatus::Closed);
    assert!(reloaded.open_trade_for(&cfg.symbol).is_none());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn reconciliation_flags_divergent_exchange_pnl() {
    let cfg = test_config();
    let sizer = RiskSizer::new(cfg.risk.clone(), cfg.take_profit_levels.clone()).unwrap();
    let plan = sizer.size(Direction::Long, 100.0, 0.001).unwrap();

    let mut manager = TradeLifecycleManager::new(
        &cfg.symbol,
        cfg.lifecycle.clone(),
        TradeJournal::in_memory(),
    );
    manager
        .begin_open(Direction::Long, &plan, 70.0, Utc::now())
        .unwrap();
    manager.confirm_open(100.0).unwrap();
    let closed = manager
        .on_price_update(97.0, 0.0, Utc::now())
        .unwrap()
        .unwrap();

    let mut exchange = SimExchange::new();
    let computed = closed.exit.as_ref().unwrap().realized_pnl;
    exchange.set_closed_pnl(&cfg.symbol, closed.id, computed - 2.0);

    let exchange_pnl = exchange
        .closed_pnl(&cfg.symbol, closed.id)
        .await
        .unwrap()
        .unwrap();
    let report = reconcile(&closed, exchange_pnl, cfg.lifecycle.reconcile_tolerance_usdt);
    assert!(!report.within_tolerance);
    assert!((report.difference - 2.0).abs() < 1e-9);

    let report = reconcile(&closed, computed, cfg.lifecycle.reconcile_tolerance_usdt);
    assert!(report.within_tolerance);
}
