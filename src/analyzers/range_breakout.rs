use crate::analyzers::{validate_window, Analyzer, Signal};
use crate::config::AnalyzerSettings;
use crate::error::{AnalyzerError, ConfigError};
use crate::models::{Candle, SignalDirection};

pub const ID: &str = "range_breakout";

const LOOKBACK: usize = 30;

/// Votes when the latest close escapes the high/low range built by the
/// preceding candles of the lookback window.
pub struct RangeBreakoutAnalyzer {
    settings: AnalyzerSettings,
    last_signal: Option<Signal>,
}

impl RangeBreakoutAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Result<Self, ConfigError> {
        settings.validate(ID)?;
        Ok(Self {
            settings,
            last_signal: None,
        })
    }
}

impl Analyzer for RangeBreakoutAnalyzer {
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
        let (range, last) = window.split_at(window.len() - 1);
        let range_high = range.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let range_low = range.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let close = last[0].close;

        let (direction, confidence) = if close > range_high {
            let overshoot = (close - range_high) / range_high;
            (
                SignalDirection::Long,
                (55.0 + overshoot * 5000.0).min(95.0).round() as u8,
            )
        } else if close < range_low {
            let overshoot = (range_low - close) / range_low;
            (
                SignalDirection::Short,
                (55.0 + overshoot * 5000.0).min(95.0).round() as u8,
            )
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_candles, test_analyzer_settings};

    fn ranging_then_break(break_close: f64) -> Vec<(f64, f64, f64, f64)> {
        let mut data: Vec<(f64, f64, f64, f64)> = (0..34)
            .map(|i| {
                let p = 100.0 + (i % 3) as f64 * 0.5;
                (p, p + 1.0, p - 1.0, p + 0.2)
            })
            .collect();
        data.push((101.0, break_close + 0.5, 98.5, break_close));
        data
    }

    #[test]
    fn close_above_range_votes_long() {
        let mut a = RangeBreakoutAnalyzer::new(test_analyzer_settings(0.8, 7)).unwrap();
        let s = make_candles(&ranging_then_break(103.5));
        let signal = a.analyze(s.as_slice()).unwrap();
        assert_eq!(signal.direction, SignalDirection::Long);
        assert!(signal.confidence >= 55);
    }

    #[test]
    fn close_below_range_votes_short() {
        let mut a = RangeBreakoutAnalyzer::new(test_analyzer_settings(0.8, 7)).unwrap();
        let mut data = ranging_then_break(97.0);
        data.last_mut().unwrap().2 = 96.0;
        let s = make_candles(&data);
        let signal = a.analyze(s.as_slice()).unwrap();
        assert_eq!(signal.direction, SignalDirection::Short);
    }

    #[test]
    fn close_inside_range_votes_hold() {
        let mut a = RangeBreakoutAnalyzer::new(test_analyzer_settings(0.8, 7)).unwrap();
        let s = make_candles(&ranging_then_break(100.5));
        let signal = a.analyze(s.as_slice()).unwrap();
        assert_eq!(signal.direction, SignalDirection::Hold);
    }
}
