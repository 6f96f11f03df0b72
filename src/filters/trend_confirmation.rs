use tracing::warn;

use crate::filters::{Filter, FilterContext, FilterResult};
use crate::models::{Candle, Trend};

pub const NAME: &str = "trend_confirmation";

const FAST_PERIOD: usize = 10;
const SLOW_PERIOD: usize = 30;

/// Blocks entries that fight the broader trend of the entry window.
pub struct TrendConfirmationFilter {
    enabled: bool,
}

impl TrendConfirmationFilter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

/// Simple-average trend read over the window's closes.
pub fn window_trend(candles: &[Candle]) -> Option<Trend> {
    if candles.len() < SLOW_PERIOD {
        return None;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let sma = |n: usize| -> f64 {
        let slice = &closes[closes.len() - n..];
        slice.iter().sum::<f64>() / n as f64
    };
    let fast = sma(FAST_PERIOD);
    let slow = sma(SLOW_PERIOD);
    let separation = (fast - slow) / slow;
    Some(if separation > 0.001 {
        Trend::Bullish
    } else if separation < -0.001 {
        Trend::Bearish
    } else {
        Trend::Neutral
    })
}

impl Filter for TrendConfirmationFilter {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterResult {
        let Some(trend) = window_trend(ctx.candles) else {
            // Not enough data to read a trend: fail open, but say so.
            warn!(
                "{}: window too short for a trend read, passing {}",
                NAME, ctx.direction
            );
            return FilterResult::Pass;
        };

        if trend.opposes(ctx.direction) {
            FilterResult::Block(format!("{} trend opposes {} entry", trend, ctx.direction))
        } else {
            FilterResult::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend};

    fn ctx(candles: &crate::models::CandleSeries, direction: Direction) -> FilterContext<'_> {
        FilterContext {
            direction,
            candles: candles.as_slice(),
            current_price: candles.last().unwrap().close,
            funding_rate: None,
            reference_trend: None,
        }
    }

    #[test]
    fn blocks_long_into_bearish_trend() {
        let f = TrendConfirmationFilter::new(true);
        let candles = make_bearish_trend(40, 5000.0);
        assert!(matches!(
            f.evaluate(&ctx(&candles, Direction::Long)),
            FilterResult::Block(_)
        ));
    }

    #[test]
    fn passes_long_with_bullish_trend() {
        let f = TrendConfirmationFilter::new(true);
        let candles = make_bullish_trend(40, 100.0);
        assert_eq!(
            f.evaluate(&ctx(&candles, Direction::Long)),
            FilterResult::Pass
        );
    }

    #[test]
    fn fails_open_on_short_window() {
        let f = TrendConfirmationFilter::new(true);
        let candles = make_bearish_trend(10, 5000.0);
        assert_eq!(
            f.evaluate(&ctx(&candles, Direction::Long)),
            FilterResult::Pass
        );
    }
}
