use crate::analyzers::{validate_window, Analyzer, Signal};
use crate::config::AnalyzerSettings;
use crate::error::{AnalyzerError, ConfigError};
use crate::models::{Candle, SignalDirection};

pub const ID: &str = "ema_trend";

const FAST_PERIOD: usize = 9;
const SLOW_PERIOD: usize = 21;

/// Votes with the EMA cross: fast above slow is long, below is short.
/// Confidence scales with the separation between the two averages.
pub struct EmaTrendAnalyzer {
    settings: AnalyzerSettings,
    last_signal: Option<Signal>,
}

impl EmaTrendAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Result<Self, ConfigError> {
        settings.validate(ID)?;
        Ok(Self {
            settings,
            last_signal: None,
        })
    }
}

/// Standard EMA seeded from the first value. Computed fresh from the window
/// each call so identical windows always yield identical results.
fn ema(values: &[f64], period: usize) -> f64 {
    let k = 2.0 / (period as f64 + 1.0);
    let mut e = values[0];
    for v in &values[1..] {
        e = v * k + e * (1.0 - k);
    }
    e
}

impl Analyzer for EmaTrendAnalyzer {
    fn id(&self) -> &str {
        ID
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn min_lookback(&self) -> usize {
        SLOW_PERIOD + 1
    }

    fn analyze(&mut self, candles: &[Candle]) -> Result<Signal, AnalyzerError> {
        validate_window(self.settings.enabled, self.min_lookback(), candles)?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let fast = ema(&closes, FAST_PERIOD);
        let slow = ema(&closes, SLOW_PERIOD);

        let separation = (fast - slow) / slow;

        // Averages effectively on top of each other: no edge either way.
        let (direction, confidence) = if separation.abs() < 0.0005 {
            (SignalDirection::Hold, 0)
        } else {
            let direction = if separation > 0.0 {
                SignalDirection::Long
            } else {
                SignalDirection::Short
            };
            // 1% separation maps to confidence 90; capped at 95.
            let confidence = (50.0 + separation.abs() * 4000.0).min(95.0).round() as u8;
            (direction, confidence)
        };

        let signal = Signal {
            source: ID.to_string(),
            direction,
            confidence,
            weight: self.settings.weight,
            priority: self.settings.priority,
        };
        self.last_signal = Some(signal.clone());
        Ok(signal)
    }

    fn reset(&mut self) {
        self.last_signal = None;
    }

    fn last_signal(&self) -> Option<&Signal> {
        self.last_signal.as_ref()
    }
}
