use tracing::warn;

use crate::filters::{Filter, FilterContext, FilterResult};

pub const NAME: &str = "flat_market";

/// Blocks entries when the recent high-low range has compressed below a
/// fraction of price. Breakouts from nothing tend to be noise.
pub struct FlatMarketFilter {
    enabled: bool,
    min_range_percent: f64,
    lookback: usize,
}

impl FlatMarketFilter {
    pub fn new(enabled: bool, min_range_percent: f64, lookback: usize) -> Self {
        Self {
            enabled,
            min_range_percent,
            lookback,
        }
    }
}

impl Filter for FlatMarketFilter {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterResult {
        if ctx.candles.len() < self.lookback {
            warn!("{}: window below lookback, passing {}", NAME, ctx.direction);
            return FilterResult::Pass;
        }

        let window = &ctx.candles[ctx.candles.len() - self.lookback..];
        let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let range_percent = (high - low) / ctx.current_price * 100.0;

        if range_percent < self.min_range_percent {
            FilterResult::Block(format!(
                "range {:.3}% over last {} candles below {:.3}%",
                range_percent, self.lookback, self.min_range_percent
            ))
        } else {
            FilterResult::Pass
        }
    }
}
