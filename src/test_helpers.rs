//! Shared fixtures for unit tests. Compiled only under cfg(test).

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;

use crate::analyzers::Signal;
use crate::config::{
    AggregatorSettings, AnalyzerSettings, Config, FilterSettings, LifecycleSettings,
    RiskSettings, TpLevelSettings,
};
use crate::models::{Candle, CandleSeries, SignalDirection};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Build a series from (open, high, low, close) tuples, one minute apart.
pub fn make_candles(ohlc: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let start = base_time();
    let candles = ohlc
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: start + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(candles)
}

/// A steady climb of 0.5% per candle starting at `start`.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start * 1.005f64.powi(i as i32);
            let close = open * 1.005;
            (open, close * 1.001, open * 0.999, close)
        })
        .collect();
    make_candles(&data)
}

/// A steady fall of 0.5% per candle starting at `start`.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start * 0.995f64.powi(i as i32);
            let close = open * 0.995;
            (open, open * 1.001, close * 0.999, close)
        })
        .collect();
    make_candles(&data)
}

pub fn make_signal(
    source: &str,
    direction: SignalDirection,
    confidence: u8,
    weight: f64,
    priority: u8,
) -> Signal {
    Signal {
        source: source.to_string(),
        direction,
        confidence,
        weight,
        priority,
    }
}

pub fn test_analyzer_settings(weight: f64, priority: u8) -> AnalyzerSettings {
    AnalyzerSettings {
        enabled: true,
        weight,
        priority,
    }
}

pub fn test_aggregator_settings() -> AggregatorSettings {
    AggregatorSettings {
        min_confidence_threshold: 40.0,
        conflict_penalty: 0.3,
        strong_conflict_minority_fraction: 0.4,
    }
}

pub fn test_risk_settings() -> RiskSettings {
    RiskSettings {
        stop_loss_percent: 2.0,
        position_size_usdt: 100.0,
        leverage: 3.0,
        max_stop_loss_percent: 10.0,
    }
}

/// Three-rung ladder at +1%/+2%/+4% closing 50/30/20 percent.
pub fn test_ladder() -> Vec<TpLevelSettings> {
    vec![
        TpLevelSettings {
            level: 1,
            price_offset_percent: 1.0,
            close_percent: 50.0,
        },
        TpLevelSettings {
            level: 2,
            price_offset_percent: 2.0,
            close_percent: 30.0,
        },
        TpLevelSettings {
            level: 3,
            price_offset_percent: 4.0,
            close_percent: 20.0,
        },
    ]
}

pub fn test_lifecycle_settings() -> LifecycleSettings {
    LifecycleSettings {
        move_to_breakeven_on_tp1: true,
        reconcile_tolerance_usdt: 0.5,
    }
}

pub fn test_filter_settings() -> FilterSettings {
    FilterSettings {
        trend_confirmation_enabled: true,
        funding_rate_enabled: true,
        correlation_enabled: true,
        flat_market_enabled: true,
        max_funding_against: 0.0010,
        funding_penalty: 10.0,
        correlation_penalty: 8.0,
        flat_range_percent: 0.15,
        flat_lookback: 30,
    }
}

pub fn default_test_config() -> Config {
    let mut analyzers = HashMap::new();
    analyzers.insert("ema_trend".to_string(), test_analyzer_settings(0.9, 8));
    analyzers.insert("rsi".to_string(), test_analyzer_settings(0.7, 6));
    analyzers.insert("momentum".to_string(), test_analyzer_settings(0.6, 5));
    analyzers.insert(
        "range_breakout".to_string(),
        test_analyzer_settings(0.8, 7),
    );

    Config {
        symbol: "BTCUSDT".to_string(),
        reference_symbol: "ETHUSDT".to_string(),
        analyzers,
        risk: test_risk_settings(),
        aggregator: test_aggregator_settings(),
        take_profit_levels: test_ladder(),
        lifecycle: test_lifecycle_settings(),
        filters: test_filter_settings(),
        min_candles: 50,
        log_dir: "logs".to_string(),
        log_level: "INFO".to_string(),
    }
}
