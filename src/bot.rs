use anyhow::Result;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use fusion_trading_bot::aggregator::{CompositeDecision, SignalAggregator};
use fusion_trading_bot::analyzers::{build_registry, AnalyzerRegistry};
use fusion_trading_bot::config::SharedConfig;
use fusion_trading_bot::exchange::{CandleProvider, Exchange};
use fusion_trading_bot::filters::{trend_confirmation, FilterChain, FilterContext};
use fusion_trading_bot::models::{Direction, SignalDirection};
use fusion_trading_bot::risk::{EntryPlan, RiskSizer};
use fusion_trading_bot::trading::journal::{journal_path, TradeJournal};
use fusion_trading_bot::trading::lifecycle::TradeLifecycleManager;
use fusion_trading_bot::trading::reconcile;

const SCAN_INTERVAL: f64 = 60.0;
const POSITION_CHECK_INTERVAL: f64 = 10.0;

pub struct FusionBot {
    config: SharedConfig,
    exchange: Box<dyn Exchange>,
    data: Box<dyn CandleProvider>,
    registry: AnalyzerRegistry,
    aggregator: SignalAggregator,
    filters: FilterChain,
    sizer: RiskSizer,
    lifecycle: TradeLifecycleManager,

    last_scan: Instant,
    last_position_check: Instant,
    /// Set on a state-machine invariant violation; no further entries.
    halted: bool,
}

impl FusionBot {
    pub async fn new(
        config: SharedConfig,
        exchange: Box<dyn Exchange>,
        data: Box<dyn CandleProvider>,
    ) -> Result<Self> {
        let cfg = config.read().await.clone();

        info!("{}", "=".repeat(60));
        info!("Fusion trading bot starting up");
        info!("Symbol: {} (reference: {})", cfg.symbol, cfg.reference_symbol);
        info!(
            "Analyzers: {}",
            cfg.analyzers
                .iter()
                .map(|(name, s)| format!("{} w={} p={}", name, s.weight, s.priority))
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!(
            "Risk: {} USDT x{} SL {}%",
            cfg.risk.position_size_usdt, cfg.risk.leverage, cfg.risk.stop_loss_percent
        );
        info!("{}", "=".repeat(60));

        let registry = build_registry(&cfg.symbol, &cfg.analyzers)?;
        let aggregator = SignalAggregator::new(cfg.aggregator.clone());
        let filters = FilterChain::from_settings(&cfg.filters);
        let sizer = RiskSizer::new(cfg.risk.clone(), cfg.take_profit_levels.clone())?;

        let journal = TradeJournal::open(journal_path(&cfg.log_dir))?;
        let lifecycle = TradeLifecycleManager::new(&cfg.symbol, cfg.lifecycle.clone(), journal);

        let now = Instant::now();
        Ok(Self {
            config,
            exchange,
            data,
            registry,
            aggregator,
            filters,
            sizer,
            lifecycle,
            last_scan: now,
            last_position_check: now,
            halted: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.shutdown();
                    return Ok(());
                }
                _ = self.tick() => {}
            }
        }
    }

    async fn tick(&mut self) {
        if self.last_position_check.elapsed().as_secs_f64() > POSITION_CHECK_INTERVAL {
            self.check_position().await;
            self.last_position_check = Instant::now();
        }

        if self.last_scan.elapsed().as_secs_f64() > SCAN_INTERVAL {
            self.scan().await;
            self.last_scan = Instant::now();
        }

        tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
    }

    /// One full decision cycle: analyze, aggregate, gate, size, enter.
    async fn scan(&mut self) {
        if self.halted {
            return;
        }
        if self.lifecycle.has_open_position() {
            debug!("scan skipped: position already open");
            return;
        }
        let cfg = self.config.read().await.clone();

        let candles = match self.data.load_candles(&cfg.symbol, cfg.min_candles).await {
            Ok(c) => c,
            Err(e) => {
                warn!("{}: candle load failed, skipping cycle: {}", cfg.symbol, e);
                return;
            }
        };

        let cycle = self.registry.evaluate(&cfg.symbol, candles.m15.as_slice());
        if cycle.absent > 0 {
            debug!(
                "{}: {} analyzer(s) absent this cycle",
                cfg.symbol, cycle.absent
            );
        }
        if !cycle
            .signals
            .iter()
            .any(|s| s.direction != SignalDirection::Hold)
        {
            debug!("{}: no directional signals this cycle", cfg.symbol);
            return;
        }

        let current_price = match self.exchange.current_price(&cfg.symbol).await {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: no current price, skipping cycle: {}", cfg.symbol, e);
                return;
            }
        };

        // External context for the gates; absence is explicit, never fatal.
        let funding_rate = self
            .exchange
            .funding_rate(&cfg.symbol)
            .await
            .unwrap_or_default();
        let reference_trend = match self
            .data
            .load_candles(&cfg.reference_symbol, cfg.min_candles)
            .await
        {
            Ok(reference) => trend_confirmation::window_trend(reference.m15.as_slice()),
            Err(e) => {
                debug!("{}: reference candles unavailable: {}", cfg.reference_symbol, e);
                None
            }
        };

        // Gate each fired direction before fusion: a veto removes only that
        // direction's signals, so the other side can still carry the cycle.
        let gated = self.filters.gate(&cycle.signals, |direction| FilterContext {
            direction,
            candles: candles.m15.as_slice(),
            current_price,
            funding_rate,
            reference_trend,
        });
        for veto in &gated.vetoed {
            info!(
                "{}: {} entry blocked by {}: {}",
                cfg.symbol, veto.direction, veto.filter, veto.reason
            );
        }

        let decision = self.aggregator.aggregate(&gated.signals);
        self.log_decision(&cfg.symbol, &decision);
        let Some(direction) = decision.direction.to_direction() else {
            return;
        };
        let confidence = decision.confidence;

        let step = match self.exchange.min_qty_step(&cfg.symbol).await {
            Ok(s) => s,
            Err(e) => {
                warn!("{}: no quantity step, skipping cycle: {}", cfg.symbol, e);
                return;
            }
        };
        let plan = match self.sizer.size(direction, current_price, step) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("{}: sizing refused: {}", cfg.symbol, e);
                return;
            }
        };

        if let Err(e) = self.enter(&cfg.symbol, direction, &plan, confidence).await {
            error!("{}: entry failed, halting symbol: {}", cfg.symbol, e);
            self.halted = true;
        }
    }

    async fn enter(
        &mut self,
        symbol: &str,
        direction: Direction,
        plan: &EntryPlan,
        confidence: f64,
    ) -> Result<()> {
        self.lifecycle
            .begin_open(direction, plan, confidence, Utc::now())?;

        match self
            .exchange
            .place_entry_order(symbol, direction, plan.quantity)
            .await
        {
            Ok(ack) => {
                self.lifecycle.confirm_open(ack.fill_price)?;
                Ok(())
            }
            Err(e) => {
                // Nothing filled; drop the provisional entry and move on.
                warn!("{}: entry order rejected: {}", symbol, e);
                self.lifecycle.abort_open()?;
                Ok(())
            }
        }
    }

    async fn check_position(&mut self) {
        if !self.lifecycle.has_open_position() {
            return;
        }
        let cfg = self.config.read().await.clone();

        let price = match self.exchange.current_price(&cfg.symbol).await {
            Ok(p) => p,
            Err(e) => {
                debug!("{}: position check skipped, no price: {}", cfg.symbol, e);
                return;
            }
        };
        let fee_rate = self.exchange.fee_rate().await.unwrap_or(0.0);

        match self.lifecycle.on_price_update(price, fee_rate, Utc::now()) {
            Ok(Some(closed)) => {
                self.registry.reset_symbol(&cfg.symbol);
                match self.exchange.closed_pnl(&cfg.symbol, closed.id).await {
                    Ok(Some(exchange_pnl)) => {
                        reconcile(&closed, exchange_pnl, cfg.lifecycle.reconcile_tolerance_usdt);
                    }
                    Ok(None) => {
                        debug!("{}: no exchange PnL record yet for #{}", cfg.symbol, closed.id);
                    }
                    Err(e) => warn!("{}: reconciliation fetch failed: {}", cfg.symbol, e),
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("{}: lifecycle error, halting symbol: {}", cfg.symbol, e);
                self.halted = true;
            }
        }
    }

    fn log_decision(&self, symbol: &str, decision: &CompositeDecision) {
        if decision.direction == SignalDirection::Hold {
            debug!(
                "{}: HOLD (confidence {:.1}, conflict {}, {} explicit holds)",
                symbol, decision.confidence, decision.conflict, decision.hold_count
            );
        } else {
            info!(
                "{}: {} candidate, confidence {:.1}, conflict {}, {} contributing",
                symbol,
                decision.direction,
                decision.confidence,
                decision.conflict,
                decision.contributing.len()
            );
        }
    }

    fn shutdown(&self) {
        info!("Shutting down");
        if self.lifecycle.has_open_position() {
            warn!(
                "a position is still {} for {}; it resumes from the journal on restart",
                self.lifecycle.state().name(),
                self.config.try_read().map(|c| c.symbol.clone()).unwrap_or_default()
            );
        }
    }
}
