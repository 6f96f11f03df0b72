use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, ExitType, TradeStatus};
use crate::risk::{EntryPlan, TakeProfitLevel};

/// A partial take-profit execution against an open trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialFill {
    pub level: u8,
    pub price: f64,
    pub quantity: f64,
    /// Net of the exit fee for this portion.
    pub pnl: f64,
    pub time: DateTime<Utc>,
}

/// How and when a trade ended. Only present once status is Closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitCondition {
    pub exit_type: ExitType,
    pub exit_price: f64,
    pub realized_pnl: f64,
    pub holding_time_secs: i64,
}

/// The central position entity. Created by the lifecycle manager, mutated
/// only by it, and appended to the journal where it lives forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub side: Direction,
    pub entry_price: f64,
    /// Original entry quantity; never changes after open.
    pub quantity: f64,
    /// Monotonically non-increasing as TP levels fill.
    #[serde(default)]
    pub remaining_quantity: f64,
    pub leverage: f64,
    pub stop_loss_price: f64,
    pub take_profit_levels: Vec<TakeProfitLevel>,
    pub entry_confidence: f64,
    pub opened_at: DateTime<Utc>,
    pub status: TradeStatus,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit: Option<ExitCondition>,
    #[serde(default)]
    pub partial_fills: Vec<PartialFill>,
    #[serde(default)]
    pub sl_moved_to_breakeven: bool,
    #[serde(default)]
    pub manual_reason: Option<String>,
}

impl Trade {
    pub fn open(
        id: u64,
        symbol: &str,
        side: Direction,
        plan: &EntryPlan,
        entry_confidence: f64,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            side,
            entry_price: plan.entry_price,
            quantity: plan.quantity,
            remaining_quantity: plan.quantity,
            leverage: plan.leverage,
            stop_loss_price: plan.stop_loss_price,
            take_profit_levels: plan.take_profit_levels.clone(),
            entry_confidence,
            opened_at,
            status: TradeStatus::Open,
            closed_at: None,
            exit: None,
            partial_fills: Vec::new(),
            sl_moved_to_breakeven: false,
            manual_reason: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Signed PnL of one portion exiting at `price`, before fees.
    pub fn portion_pnl(&self, price: f64, portion_quantity: f64) -> f64 {
        (price - self.entry_price) * portion_quantity * self.side.sign()
    }

    /// PnL realized so far through partial fills (each already net of fees).
    pub fn partial_pnl(&self) -> f64 {
        self.partial_fills.iter().map(|f| f.pnl).sum()
    }
}
