use tracing::warn;

use crate::filters::{Filter, FilterContext, FilterResult};
use crate::models::Direction;

pub const NAME: &str = "funding_rate";

/// Perpetual funding gate. Paying heavy funding to hold the position is a
/// hard block; mild funding against the entry only costs confidence.
pub struct FundingRateFilter {
    enabled: bool,
    max_against: f64,
    penalty: f64,
}

impl FundingRateFilter {
    pub fn new(enabled: bool, max_against: f64, penalty: f64) -> Self {
        Self {
            enabled,
            max_against,
            penalty,
        }
    }
}

impl Filter for FundingRateFilter {
    fn name(&self) -> &str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, ctx: &FilterContext) -> FilterResult {
        let Some(rate) = ctx.funding_rate else {
            warn!("{}: funding rate unavailable, passing {}", NAME, ctx.direction);
            return FilterResult::Pass;
        };

        // Positive funding is paid by longs, negative by shorts.
        let against = match ctx.direction {
            Direction::Long => rate,
            Direction::Short => -rate,
        };

        if against >= self.max_against {
            FilterResult::Block(format!(
                "funding {:.5} against {} exceeds {:.5}",
                rate, ctx.direction, self.max_against
            ))
        } else if against > 0.0 {
            FilterResult::Adjust(self.penalty)
        } else {
            FilterResult::Pass
        }
    }
}
