use crate::analyzers::{validate_window, Analyzer, Signal};
use crate::config::AnalyzerSettings;
use crate::error::{AnalyzerError, ConfigError};
use crate::models::{Candle, SignalDirection};

pub const ID: &str = "momentum";

const LOOKBACK: usize = 20;

/// Rate-of-change vote over the last LOOKBACK closes.
pub struct MomentumAnalyzer {
    settings: AnalyzerSettings,
    last_signal: Option<Signal>,
}

impl MomentumAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Result<Self, ConfigError> {
        settings.validate(ID)?;
        Ok(Self {
            settings,
            last_signal: None,
        })
    }
}

impl Analyzer for MomentumAnalyzer {
    fn id(&self) -> &str {
        ID
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn min_lookback(&self) -> usize {
        LOOKBACK
    }

    fn analyze(&mut self, candles: &[Candle]) -> Result<Signal, AnalyzerError> {
        validate_window(self.settings.enabled, self.min_lookback(), candles)?;

        let window = &candles[candles.len() - LOOKBACK..];
        let first = window[0].close;
        let last = window[window.len() - 1].close;
        let roc = (last - first) / first;

        let (direction, confidence) = if roc.abs() < 0.002 {
            (SignalDirection::Hold, 0)
        } else {
            let direction = if roc > 0.0 {
                SignalDirection::Long
            } else {
                SignalDirection::Short
            };
            // 2% move over the lookback maps to confidence 90.
            let confidence = (50.0 + roc.abs() * 2000.0).min(95.0).round() as u8;
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
