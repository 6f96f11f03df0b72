pub mod ema_trend;
pub mod momentum;
pub mod range_breakout;
pub mod rsi;

pub use ema_trend::EmaTrendAnalyzer;
pub use momentum::MomentumAnalyzer;
pub use range_breakout::RangeBreakoutAnalyzer;
pub use rsi::RsiAnalyzer;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::AnalyzerSettings;
use crate::error::AnalyzerError;
use crate::models::{Candle, SignalDirection};

/// One analyzer's vote for a single evaluation cycle. Immutable once
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source: String,
    pub direction: SignalDirection,
    /// Integer 0-100 scale, shared by every analyzer.
    pub confidence: u8,
    pub weight: f64,
    pub priority: u8,
}

impl Signal {
    /// The cross-analyzer scoring invariant: every analyzer's score is
    /// computed by this one function, never per-analyzer.
    pub fn score(&self) -> f64 {
        f64::from(self.confidence) / 100.0 * self.weight
    }
}

/// Capability contract every analyzer implements. `analyze` is a pure
/// function of the window plus the analyzer's own state; its only side
/// effect is recording `last_signal`.
pub trait Analyzer: Send {
    fn id(&self) -> &str;
    fn is_enabled(&self) -> bool;
    /// Minimum window length this analyzer needs.
    fn min_lookback(&self) -> usize;
    fn analyze(&mut self, candles: &[Candle]) -> Result<Signal, AnalyzerError>;
    /// Clears per-cycle state; configuration is kept.
    fn reset(&mut self);
    fn last_signal(&self) -> Option<&Signal>;
}

/// Shared precondition checks, run by every analyzer before touching the
/// window. Disabled analyzers refuse the call outright.
pub fn validate_window(
    enabled: bool,
    min_lookback: usize,
    candles: &[Candle],
) -> Result<(), AnalyzerError> {
    if !enabled {
        return Err(AnalyzerError::Disabled);
    }
    if candles.is_empty() {
        return Err(AnalyzerError::EmptyWindow);
    }
    if candles.len() < min_lookback {
        return Err(AnalyzerError::InsufficientData {
            required: min_lookback,
            got: candles.len(),
        });
    }
    for (index, candle) in candles.iter().enumerate() {
        if !candle.is_well_formed() {
            return Err(AnalyzerError::MalformedCandle { index });
        }
    }
    if candles
        .windows(2)
        .any(|w| w[0].timestamp >= w[1].timestamp)
    {
        return Err(AnalyzerError::UnsortedWindow);
    }
    Ok(())
}

/// Per-symbol analyzer instances. Lifecycle (reset) is owned by the
/// orchestrating loop, not by the analyzers themselves.
#[derive(Default)]
pub struct AnalyzerRegistry {
    by_symbol: HashMap<String, Vec<Box<dyn Analyzer>>>,
}

/// The post-evaluation picture for one cycle: the signals that fired, plus
/// how many analyzers errored and were treated as absent.
#[derive(Debug, Clone, Default)]
pub struct CycleSignals {
    pub signals: Vec<Signal>,
    pub absent: usize,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: &str, analyzer: Box<dyn Analyzer>) {
        self.by_symbol
            .entry(symbol.to_string())
            .or_default()
            .push(analyzer);
    }

    pub fn analyzer_count(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map_or(0, |v| v.len())
    }

    /// Run every registered analyzer for the symbol over the window.
    /// Per-analyzer errors are isolated: the failing analyzer contributes
    /// no signal this cycle and the rest proceed.
    pub fn evaluate(&mut self, symbol: &str, candles: &[Candle]) -> CycleSignals {
        let mut cycle = CycleSignals::default();
        let Some(analyzers) = self.by_symbol.get_mut(symbol) else {
            return cycle;
        };

        for analyzer in analyzers.iter_mut() {
            match analyzer.analyze(candles) {
                Ok(signal) => cycle.signals.push(signal),
                Err(AnalyzerError::Disabled) => {}
                Err(e) => {
                    debug!("{}: analyzer {} skipped: {}", symbol, analyzer.id(), e);
                    cycle.absent += 1;
                }
            }
        }

        cycle
    }

    pub fn reset_symbol(&mut self, symbol: &str) {
        if let Some(analyzers) = self.by_symbol.get_mut(symbol) {
            for analyzer in analyzers.iter_mut() {
                analyzer.reset();
            }
        }
    }
}

/// Build the full analyzer set for a symbol from validated settings.
pub fn build_registry(
    symbol: &str,
    settings: &HashMap<String, AnalyzerSettings>,
) -> Result<AnalyzerRegistry, crate::error::ConfigError> {
    let mut registry = AnalyzerRegistry::new();

    if let Some(s) = settings.get("ema_trend") {
        registry.register(symbol, Box::new(EmaTrendAnalyzer::new(s.clone())?));
    }
    if let Some(s) = settings.get("rsi") {
        registry.register(symbol, Box::new(RsiAnalyzer::new(s.clone())?));
    }
    if let Some(s) = settings.get("momentum") {
        registry.register(symbol, Box::new(MomentumAnalyzer::new(s.clone())?));
    }
    if let Some(s) = settings.get("range_breakout") {
        registry.register(symbol, Box::new(RangeBreakoutAnalyzer::new(s.clone())?));
    }

    Ok(registry)
}
