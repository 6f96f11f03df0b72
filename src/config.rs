use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ConfigError;

pub type SharedConfig = Arc<RwLock<Config>>;

/// Per-analyzer configuration. The recognized fields are fixed; anything an
/// analyzer needs beyond these lives in its own constructor arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    pub enabled: bool,
    pub weight: f64,
    pub priority: u8,
}

impl AnalyzerSettings {
    /// Fail-fast range checks, run at construction rather than at call time.
    pub fn validate(&self, analyzer: &str) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.weight) || !self.weight.is_finite() {
            return Err(ConfigError::WeightOutOfRange {
                analyzer: analyzer.to_string(),
                weight: self.weight,
            });
        }
        if !(1..=10).contains(&self.priority) {
            return Err(ConfigError::PriorityOutOfRange {
                analyzer: analyzer.to_string(),
                priority: self.priority,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Stop-loss distance from entry, as a percent (2.0 = 2%).
    pub stop_loss_percent: f64,
    /// Margin committed per position, in quote currency.
    pub position_size_usdt: f64,
    pub leverage: f64,
    /// Guard against config/price errors: SL distance above this is refused.
    pub max_stop_loss_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSettings {
    /// Decisions below this confidence become Hold (0-100 scale).
    pub min_confidence_threshold: f64,
    /// Fraction the confidence is reduced by on a strong conflict (0.3 = -30%).
    pub conflict_penalty: f64,
    /// Minority summed weight at or above this fraction of the majority's
    /// marks the conflict as strong.
    pub strong_conflict_minority_fraction: f64,
}

/// One rung of the take-profit ladder, as configured. Prices are derived at
/// entry time by the sizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpLevelSettings {
    pub level: u8,
    /// Distance from entry in the trade's favor, as a percent.
    pub price_offset_percent: f64,
    /// Percent of the original quantity closed at this level.
    pub close_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// Move the stop to entry price once the first TP level fills.
    pub move_to_breakeven_on_tp1: bool,
    /// Tolerance for the computed-vs-exchange PnL reconciliation check.
    pub reconcile_tolerance_usdt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    pub trend_confirmation_enabled: bool,
    pub funding_rate_enabled: bool,
    pub correlation_enabled: bool,
    pub flat_market_enabled: bool,
    /// Funding rate (absolute, per interval) beyond which entries against
    /// the funding direction are blocked.
    pub max_funding_against: f64,
    /// Confidence penalty when funding leans against the entry but is below
    /// the blocking threshold.
    pub funding_penalty: f64,
    /// Confidence penalty when the correlated reference symbol's trend
    /// opposes the entry.
    pub correlation_penalty: f64,
    /// Range over the lookback window below this percent of price counts as
    /// a flat market and blocks entries.
    pub flat_range_percent: f64,
    pub flat_lookback: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub symbol: String,
    /// Correlated reference symbol consulted by the correlation filter.
    pub reference_symbol: String,

    pub analyzers: HashMap<String, AnalyzerSettings>,
    pub risk: RiskSettings,
    pub aggregator: AggregatorSettings,
    pub take_profit_levels: Vec<TpLevelSettings>,
    pub lifecycle: LifecycleSettings,
    pub filters: FilterSettings,

    /// Minimum candles required per timeframe from the data provider.
    pub min_candles: usize,

    // Logging
    pub log_dir: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let envf = |key: &str, default: f64| -> f64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        let mut analyzers = HashMap::new();
        analyzers.insert(
            "ema_trend".to_string(),
            AnalyzerSettings {
                enabled: true,
                weight: envf("EMA_TREND_WEIGHT", 0.9),
                priority: 8,
            },
        );
        analyzers.insert(
            "rsi".to_string(),
            AnalyzerSettings {
                enabled: true,
                weight: envf("RSI_WEIGHT", 0.7),
                priority: 6,
            },
        );
        analyzers.insert(
            "momentum".to_string(),
            AnalyzerSettings {
                enabled: true,
                weight: envf("MOMENTUM_WEIGHT", 0.6),
                priority: 5,
            },
        );
        analyzers.insert(
            "range_breakout".to_string(),
            AnalyzerSettings {
                enabled: true,
                weight: envf("RANGE_BREAKOUT_WEIGHT", 0.8),
                priority: 7,
            },
        );

        Config {
            symbol: env("SYMBOL", "BTCUSDT"),
            reference_symbol: env("REFERENCE_SYMBOL", "ETHUSDT"),
            analyzers,
            risk: RiskSettings {
                stop_loss_percent: envf("STOP_LOSS_PERCENT", 2.0),
                position_size_usdt: envf("POSITION_SIZE_USDT", 100.0),
                leverage: envf("LEVERAGE", 3.0),
                max_stop_loss_percent: envf("MAX_STOP_LOSS_PERCENT", 10.0),
            },
            aggregator: AggregatorSettings {
                min_confidence_threshold: envf("MIN_CONFIDENCE", 40.0),
                conflict_penalty: envf("CONFLICT_PENALTY", 0.3),
                strong_conflict_minority_fraction: envf("STRONG_CONFLICT_FRACTION", 0.4),
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
                move_to_breakeven_on_tp1: env("MOVE_TO_BREAKEVEN", "true").to_lowercase()
                    == "true",
                reconcile_tolerance_usdt: envf("RECONCILE_TOLERANCE", 0.5),
            },
            filters: FilterSettings {
                trend_confirmation_enabled: true,
                funding_rate_enabled: true,
                correlation_enabled: true,
                flat_market_enabled: true,
                max_funding_against: envf("MAX_FUNDING_AGAINST", 0.0010),
                funding_penalty: 10.0,
                correlation_penalty: 8.0,
                flat_range_percent: envf("FLAT_RANGE_PERCENT", 0.15),
                flat_lookback: 30,
            },
            min_candles: 50,
            log_dir: env("LOG_DIR", "logs"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    /// Eager validation of every recognized option. Called once at startup;
    /// any error here must prevent trading entirely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, settings) in &self.analyzers {
            settings.validate(name)?;
        }

        let r = &self.risk;
        if r.stop_loss_percent <= 0.0 || !r.stop_loss_percent.is_finite() {
            return Err(ConfigError::Risk(format!(
                "stop_loss_percent {} must be positive",
                r.stop_loss_percent
            )));
        }
        if r.position_size_usdt <= 0.0 {
            return Err(ConfigError::Risk(format!(
                "position_size_usdt {} must be positive",
                r.position_size_usdt
            )));
        }
        if r.leverage < 1.0 {
            return Err(ConfigError::Risk(format!(
                "leverage {} must be >= 1",
                r.leverage
            )));
        }
        if r.max_stop_loss_percent <= r.stop_loss_percent {
            return Err(ConfigError::Risk(format!(
                "max_stop_loss_percent {} must exceed stop_loss_percent {}",
                r.max_stop_loss_percent, r.stop_loss_percent
            )));
        }

        let a = &self.aggregator;
        if !(0.0..=100.0).contains(&a.min_confidence_threshold) {
            return Err(ConfigError::Aggregator(format!(
                "min_confidence_threshold {} outside [0, 100]",
                a.min_confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&a.conflict_penalty) {
            return Err(ConfigError::Aggregator(format!(
                "conflict_penalty {} outside [0, 1]",
                a.conflict_penalty
            )));
        }
        if !(0.0..=1.0).contains(&a.strong_conflict_minority_fraction) {
            return Err(ConfigError::Aggregator(format!(
                "strong_conflict_minority_fraction {} outside [0, 1]",
                a.strong_conflict_minority_fraction
            )));
        }

        if self.take_profit_levels.is_empty() {
            return Err(ConfigError::Ladder("no levels configured".to_string()));
        }
        let sum: f64 = self.take_profit_levels.iter().map(|l| l.close_percent).sum();
        if (sum - 100.0).abs() > 1e-9 {
            return Err(ConfigError::Ladder(format!(
                "close percents sum to {}, expected exactly 100",
                sum
            )));
        }
        for pair in self.take_profit_levels.windows(2) {
            if pair[1].price_offset_percent <= pair[0].price_offset_percent {
                return Err(ConfigError::Ladder(format!(
                    "level {} offset must exceed level {}",
                    pair[1].level, pair[0].level
                )));
            }
        }

        Ok(())
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}
