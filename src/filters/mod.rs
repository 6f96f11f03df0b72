pub mod correlation;
pub mod flat_market;
pub mod funding_rate;
pub mod trend_confirmation;

pub use correlation::CorrelationFilter;
pub use flat_market::FlatMarketFilter;
pub use funding_rate::FundingRateFilter;
pub use trend_confirmation::TrendConfirmationFilter;

use tracing::{debug, info};

use crate::analyzers::Signal;
use crate::config::FilterSettings;
use crate::models::{Candle, Direction, SignalDirection, Trend};

/// Everything a filter is allowed to look at for one cycle, fetched up
/// front by the orchestrating loop. Filters stay pure functions of this
/// context; missing external data is an explicit `None`.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub direction: Direction,
    pub candles: &'a [Candle],
    pub current_price: f64,
    /// Current funding rate, when the exchange answered this cycle.
    pub funding_rate: Option<f64>,
    /// Trend of the correlated reference symbol, when available.
    pub reference_trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    Pass,
    Block(String),
    /// Confidence penalty on the 0-100 scale, accumulated across filters.
    Adjust(f64),
}

pub trait Filter: Send {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult;
}

/// Outcome of running the whole chain for one candidate direction.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// Short-circuited: this direction is vetoed for the cycle.
    Blocked { filter: String, reason: String },
    /// All filters passed; penalties from Adjust results are summed.
    Passed { penalty: f64 },
}

/// A direction struck from the cycle by a blocking filter.
#[derive(Debug, Clone, PartialEq)]
pub struct VetoedDirection {
    pub direction: Direction,
    pub filter: String,
    pub reason: String,
}

/// The cycle's signals after per-direction gating, ready for aggregation.
#[derive(Debug, Clone, Default)]
pub struct GateOutcome {
    pub signals: Vec<Signal>,
    pub vetoed: Vec<VetoedDirection>,
}

/// Fixed-order gating chain. Blocks short-circuit; adjustments accumulate;
/// disabled filters contribute nothing.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// The standard chain in its configured order.
    pub fn from_settings(settings: &FilterSettings) -> Self {
        Self::new(vec![
            Box::new(TrendConfirmationFilter::new(
                settings.trend_confirmation_enabled,
            )),
            Box::new(FundingRateFilter::new(
                settings.funding_rate_enabled,
                settings.max_funding_against,
                settings.funding_penalty,
            )),
            Box::new(CorrelationFilter::new(
                settings.correlation_enabled,
                settings.correlation_penalty,
            )),
            Box::new(FlatMarketFilter::new(
                settings.flat_market_enabled,
                settings.flat_range_percent,
                settings.flat_lookback,
            )),
        ])
    }

    /// Gate the cycle's signals ahead of aggregation, one chain run per
    /// fired direction. A block drops that direction's signals entirely;
    /// the other direction's group still votes. Accumulated penalties
    /// shave each surviving signal's confidence on its own 0-100 scale.
    /// Hold votes pass through untouched for diagnostics.
    pub fn gate<'a>(
        &self,
        signals: &[Signal],
        ctx_for: impl Fn(Direction) -> FilterContext<'a>,
    ) -> GateOutcome {
        let mut gated = Vec::with_capacity(signals.len());
        let mut vetoed = Vec::new();

        for direction in [Direction::Long, Direction::Short] {
            let group: Vec<&Signal> = signals
                .iter()
                .filter(|s| s.direction.to_direction() == Some(direction))
                .collect();
            if group.is_empty() {
                continue;
            }
            match self.run(&ctx_for(direction)) {
                ChainOutcome::Blocked { filter, reason } => {
                    info!("{} candidates vetoed by {}: {}", direction, filter, reason);
                    vetoed.push(VetoedDirection {
                        direction,
                        filter,
                        reason,
                    });
                }
                ChainOutcome::Passed { penalty } => {
                    for signal in group {
                        let mut signal = signal.clone();
                        if penalty > 0.0 {
                            signal.confidence = (f64::from(signal.confidence) - penalty)
                                .max(0.0)
                                .round() as u8;
                        }
                        gated.push(signal);
                    }
                }
            }
        }

        gated.extend(
            signals
                .iter()
                .filter(|s| s.direction == SignalDirection::Hold)
                .cloned(),
        );

        GateOutcome {
            signals: gated,
            vetoed,
        }
    }

    pub fn run(&self, ctx: &FilterContext) -> ChainOutcome {
        let mut penalty = 0.0;

        for filter in &self.filters {
            if !filter.is_enabled() {
                continue;
            }
            match filter.evaluate(ctx) {
                FilterResult::Pass => {}
                FilterResult::Adjust(p) => {
                    debug!(
                        "filter {} adjusts {} by -{:.1}",
                        filter.name(),
                        ctx.direction,
                        p
                    );
                    penalty += p;
                }
                FilterResult::Block(reason) => {
                    debug!("filter {} blocks {}: {}", filter.name(), ctx.direction, reason);
                    return ChainOutcome::Blocked {
                        filter: filter.name().to_string(),
                        reason,
                    };
                }
            }
        }

        ChainOutcome::Passed { penalty }
    }
}
