use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use fusion_trading_bot::config::{
    AggregatorSettings, AnalyzerSettings, Config, FilterSettings, LifecycleSettings,
    RiskSettings, TpLevelSettings,
};
use fusion_trading_bot::models::{Candle, CandleSeries};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
#[allow(dead_code)]
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base_time() + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(candles)
}

/// n candles climbing 0.5% each, starting from `start`.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let open = start * 1.005f64.powi(i as i32);
            let close = open * 1.005;
            Candle {
                timestamp: base_time() + Duration::minutes(i as i64),
                open,
                high: close * 1.001,
                low: open * 0.999,
                close,
                volume: 100.0,
            }
        })
        .collect();
    CandleSeries::new(candles)
}

/// n candles falling 0.5% each, starting from `start`.
#[allow(dead_code)]
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let open = start * 0.995f64.powi(i as i32);
            let close = open * 0.995;
            Candle {
                timestamp: base_time() + Duration::minutes(i as i64),
                open,
                high: open * 1.001,
                low: close * 0.999,
                close,
                volume: 100.0,
            }
        })
        .collect();
    CandleSeries::new(candles)
}

/// A fully validated configuration with the stock analyzer set.
pub fn test_config() -> Config {
    let mut analyzers = HashMap::new();
    for (name, weight, priority) in [
        ("ema_trend", 0.9, 8),
        ("rsi", 0.7, 6),
        ("momentum", 0.6, 5),
        ("range_breakout", 0.8, 7),
    ] {
        analyzers.insert(
            name.to_string(),
            AnalyzerSettings {
                enabled: true,
                weight,
                priority,
            },
        );
    }

    Config {
        symbol: "BTCUSDT".to_string(),
        reference_symbol: "ETHUSDT".to_string(),
        analyzers,
        risk: RiskSettings {
            stop_loss_percent: 2.0,
            position_size_usdt: 100.0,
            leverage: 3.0,
            max_stop_loss_percent: 10.0,
        },
        aggregator: AggregatorSettings {
            min_confidence_threshold: 40.0,
            conflict_penalty: 0.3,
            strong_conflict_minority_fraction: 0.4,
        },
        take_profit_levels: vec![
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
        ],
        lifecycle: LifecycleSettings {
            move_to_breakeven_on_tp1: true,
            reconcile_tolerance_usdt: 0.5,
        },
        filters: FilterSettings {
            trend_confirmation_enabled: true,
            funding_rate_enabled: true,
            correlation_enabled: true,
            flat_market_enabled: true,
            max_funding_against: 0.0010,
            funding_penalty: 10.0,
            correlation_penalty: 8.0,
            flat_range_percent: 0.15,
            flat_lookback: 30,
        },
        min_candles: 50,
        log_dir: "logs".to_string(),
        log_level: "INFO".to_string(),
    }
}
