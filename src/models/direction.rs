use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

impl Direction {
    /// +1 for long, -1 for short. Used when signing PnL.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// What a single analyzer votes for. `Hold` means the analyzer fired but
/// sees no edge; it is excluded from voting yet counted for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    Long,
    Short,
    Hold,
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::Long => write!(f, "long"),
            SignalDirection::Short => write!(f, "short"),
            SignalDirection::Hold => write!(f, "hold"),
        }
    }
}

impl SignalDirection {
    pub fn to_direction(self) -> Option<Direction> {
        match self {
            SignalDirection::Long => Some(Direction::Long),
            SignalDirection::Short => Some(Direction::Short),
            SignalDirection::Hold => None,
        }
    }
}

impl From<Direction> for SignalDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Long => SignalDirection::Long,
            Direction::Short => SignalDirection::Short,
        }
    }
}

/// Higher-timeframe trend reading used by filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
            Trend::Neutral => write!(f, "neutral"),
        }
    }
}

impl Trend {
    pub fn opposes(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Trend::Bearish, Direction::Long) | (Trend::Bullish, Direction::Short)
        )
    }
}

/// Degree of disagreement between the long and short voting groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictLevel {
    None,
    Weak,
    Strong,
}

impl fmt::Display for ConflictLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictLevel::None => write!(f, "none"),
            ConflictLevel::Weak => write!(f, "weak"),
            ConflictLevel::Strong => write!(f, "strong"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "open"),
            TradeStatus::Closed => write!(f, "closed"),
        }
    }
}

/// How a trade ended. `TakeProfit(n)` records the last ladder level hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    StopLoss,
    TakeProfit(u8),
    Manual,
}

impl fmt::Display for ExitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitType::StopLoss => write!(f, "stop_loss"),
            ExitType::TakeProfit(n) => write!(f, "take_profit_{}", n),
            ExitType::Manual => write!(f, "manual"),
        }
    }
}
