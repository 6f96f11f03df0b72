use tracing::warn;

use crate::filters::{Filter, FilterContext, FilterResult};

pub const NAME: &str = "correlation";

/// Consults the correlated reference symbol's trend; an opposing reference
/// trend costs confidence rather than vetoing outright.
pub struct CorrelationFilter {
    enabled: bool,
    penalty: f64,
}

impl CorrelationFilter {
    pub fn new(enabled: bool, penalty: f64) -> Self {
        Self { enabled, penalty }
    }
}

impl Filter for CorrelationFilter {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterResult {
        let Some(trend) = ctx.reference_trend else {
            warn!(
                "{}: reference symbol trend unavailable, passing {}",
                NAME, ctx.direction
            );
            return FilterResult::Pass;
        };

        if trend.opposes(ctx.direction) {
            FilterResult::Adjust(self.penalty)
        } else {
            FilterResult::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, Trend};
    use crate::test_helpers::make_bullish_trend;

    fn ctx(
        candles: &crate::models::CandleSeries,
        direction: Direction,
        trend: Option<Trend>,
    ) -> FilterContext<'_> {
        FilterContext {
            direction,
            candles: candles.as_slice(),
            current_price: candles.last().unwrap().close,
            funding_rate: None,
            reference_trend: trend,
        }
    }

    #[test]
    fn opposing_reference_trend_penalizes() {
        let f = CorrelationFilter::new(true, 8.0);
        let candles = make_bullish_trend(10, 100.0);
        assert_eq!(
            f.evaluate(&ctx(&candles, Direction::Long, Some(Trend::Bearish))),
            FilterResult::Adjust(8.0)
        );
    }

    #[test]
    fn aligned_reference_trend_passes() {
        let f = CorrelationFilter::new(true, 8.0);
        let candles = make_bullish_trend(10, 100.0);
        assert_eq!(
            f.evaluate(&ctx(&candles, Direction::Long, Some(Trend::Bullish))),
            FilterResult::Pass
        );
    }

    #[test]
    fn missing_reference_data_fails_open() {
        let f = CorrelationFilter::new(true, 8.0);
        let candles = make_bullish_trend(10, 100.0);
        assert_eq!(
            f.evaluate(&ctx(&candles, Direction::Long, None)),
            FilterResult::Pass
        );
    }
}
