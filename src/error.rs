use thiserror::Error;

/// Construction-time configuration failures. The process must not start
/// trading with any of these present.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("analyzer '{analyzer}': weight {weight} outside [0, 1]")]
    WeightOutOfRange { analyzer: String, weight: f64 },

    #[error("analyzer '{analyzer}': priority {priority} outside [1, 10]")]
    PriorityOutOfRange { analyzer: String, priority: u8 },

    #[error("risk: {0}")]
    Risk(String),

    #[error("aggregator: {0}")]
    Aggregator(String),

    #[error("take-profit ladder: {0}")]
    Ladder(String),
}

/// Per-call analyzer failures. The cycle is skipped for that analyzer only;
/// its signal is treated as absent, never as a neutral vote.
#[derive(Debug, Error, PartialEq)]
pub enum AnalyzerError {
    #[error("analyzer is disabled")]
    Disabled,

    #[error("empty candle window")]
    EmptyWindow,

    #[error("window of {got} candles is below the required lookback of {required}")]
    InsufficientData { required: usize, got: usize },

    #[error("candle at index {index} has a non-finite OHLCV field")]
    MalformedCandle { index: usize },

    #[error("candle window is not sorted ascending by timestamp")]
    UnsortedWindow,
}

/// Sizing failures. Fatal for the cycle, not the process; the next cycle
/// retries with fresh inputs.
#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("stop-loss distance {distance_pct:.4}% must be > 0")]
    StopDistanceNonPositive { distance_pct: f64 },

    #[error("stop-loss distance {distance_pct:.2}% exceeds the maximum of {max_pct:.2}%")]
    StopDistanceTooWide { distance_pct: f64, max_pct: f64 },

    #[error("position size rounds to zero at the exchange step of {step}")]
    QuantityRoundsToZero { step: f64 },

    #[error("take-profit close percents sum to {sum}, expected exactly 100")]
    LadderSumNot100 { sum: f64 },

    #[error("take-profit level {level} is not further from entry than level {prev}")]
    LadderNotMonotonic { level: u8, prev: u8 },

    #[error("take-profit ladder is empty")]
    LadderEmpty,

    #[error("entry price {price} is not a positive finite number")]
    BadEntryPrice { price: f64 },
}

/// State-machine invariant violations. These are programming errors: the
/// caller must halt trading for the symbol, never retry or correct.
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("open() called for {symbol} while a position is already open")]
    PositionAlreadyOpen { symbol: String },

    #[error("open() called for {symbol} while an entry is awaiting confirmation")]
    EntryPending { symbol: String },

    #[error("no open position for {symbol}")]
    NoOpenPosition { symbol: String },

    #[error("no entry awaiting confirmation for {symbol}")]
    NoPendingEntry { symbol: String },
}

/// Trade journal failures.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("journal holds {count} open entries for {symbol}; at most one is allowed")]
    MultipleOpenEntries { symbol: String, count: usize },

    #[error("no open journal entry for {symbol} to patch")]
    NoOpenEntry { symbol: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_error_messages() {
        let e = AnalyzerError::InsufficientData {
            required: 20,
            got: 5,
        };
        assert!(e.to_string().contains("lookback of 20"));
    }

    #[test]
    fn risk_error_messages() {
        let e = RiskError::LadderSumNot100 { sum: 95.0 };
        assert!(e.to_string().contains("expected exactly 100"));
    }
}
