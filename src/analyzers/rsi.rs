use crate::analyzers::{validate_window, Analyzer, Signal};
use crate::config::AnalyzerSettings;
use crate::error::{AnalyzerError, ConfigError};
use crate::models::{Candle, SignalDirection};

pub const ID: &str = "rsi";

const PERIOD: usize = 14;
const OVERSOLD: f64 = 30.0;
const OVERBOUGHT: f64 = 70.0;

/// Mean-reversion vote from Wilder's RSI: oversold leans long, overbought
/// leans short, anything in between is a hold.
pub struct RsiAnalyzer {
    settings: AnalyzerSettings,
    last_signal: Option<Signal>,
}

impl RsiAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Result<Self, ConfigError> {
        settings.validate(ID)?;
        Ok(Self {
            settings,
            last_signal: None,
        })
    }
}

fn rsi(closes: &[f64], period: usize) -> f64 {
    let mut gains = 0.0;
    let mut losses = 0.0;
    let start = closes.len() - period;
    for i in start..closes.len() {
        let delta = closes[i] - closes[i - 1];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    if losses == 0.0 {
        return 100.0;
    }
    let rs = gains / losses;
    100.0 - 100.0 / (1.0 + rs)
}

impl Analyzer for RsiAnalyzer {
    fn id(&self) -> &str {
        ID
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn min_lookback(&self) -> usize {
        PERIOD + 1
    }

    fn analyze(&mut self, candles: &[Candle]) -> Result<Signal, AnalyzerError> {
        validate_window(self.settings.enabled, self.min_lookback(), candles)?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let value = rsi(&closes, PERIOD);

        let (direction, confidence) = if value <= OVERSOLD {
            let confidence = (50.0 + (OVERSOLD - value) * 1.5).min(95.0).round() as u8;
            (SignalDirection::Long, confidence)
        } else if value >= OVERBOUGHT {
            let confidence = (50.0 + (value - OVERBOUGHT) * 1.5).min(95.0).round() as u8;
            (SignalDirection::Short, confidence)
        } else {
            (SignalDirection::Hold, 0)
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
