use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::trading::trade::Trade;

/// Outcome of comparing our computed PnL against the exchange's own
/// closed-PnL record for a trade. A mismatch is surfaced for operator
/// review; the position state is never rolled back to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub trade_id: u64,
    pub symbol: String,
    pub computed_pnl: f64,
    pub exchange_pnl: f64,
    pub difference: f64,
    pub within_tolerance: bool,
}

pub fn reconcile(trade: &Trade, exchange_pnl: f64, tolerance: f64) -> ReconciliationReport {
    let computed = trade
        .exit
        .as_ref()
        .map(|e| e.realized_pnl)
        .unwrap_or_else(|| trade.partial_pnl());
    let difference = computed - exchange_pnl;
    let within_tolerance = difference.abs() <= tolerance;

    if within_tolerance {
        debug!(
            "{}: trade #{} reconciled ({:+.4} vs {:+.4})",
            trade.symbol, trade.id, computed, exchange_pnl
        );
    } else {
        warn!(
            "{}: trade #{} PnL mismatch: computed {:+.4}, exchange {:+.4}, diff {:+.4}",
            trade.symbol, trade.id, computed, exchange_pnl, difference
        );
    }

    ReconciliationReport {
        trade_id: trade.id,
        symbol: trade.symbol.clone(),
        computed_pnl: computed,
        exchange_pnl,
        difference,
        within_tolerance,
    }
}
