use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::LifecycleSettings;
use crate::error::{JournalError, StateError};
use crate::models::{Direction, ExitType, TradeStatus};
use crate::risk::EntryPlan;
use crate::trading::journal::TradeJournal;
use crate::trading::trade::{ExitCondition, PartialFill, Trade};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// The per-symbol position state. A partial fill is an attribute of Open
/// (reduced remaining quantity), not a separate state. PendingOpen exists
/// so an unconfirmed entry order can never masquerade as an open position.
#[derive(Debug)]
pub enum PositionState {
    NoPosition,
    PendingOpen(Trade),
    Open(Trade),
}

impl PositionState {
    pub fn name(&self) -> &'static str {
        match self {
            PositionState::NoPosition => "no_position",
            PositionState::PendingOpen(_) => "pending_open",
            PositionState::Open(_) => "open",
        }
    }
}

/// Owns a single symbol's position from entry through final close. There is
/// no locking: the invariant of at most one open position per symbol holds
/// by construction, because this manager is the only writer and refuses a
/// second open while any position exists.
pub struct TradeLifecycleManager {
    symbol: String,
    settings: LifecycleSettings,
    journal: TradeJournal,
    state: PositionState,
}

impl TradeLifecycleManager {
    /// A previously journaled open trade for the symbol is adopted, so a
    /// restart resumes managing the position it left behind.
    pub fn new(symbol: &str, settings: LifecycleSettings, journal: TradeJournal) -> Self {
        let state = match journal.open_trade_for(symbol) {
            Some(trade) => {
                info!(
                    "{}: resuming open trade #{} from journal",
                    symbol, trade.id
                );
                PositionState::Open(trade.clone())
            }
            None => PositionState::NoPosition,
        };
        Self {
            symbol: symbol.to_string(),
            settings,
            journal,
            state,
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn has_open_position(&self) -> bool {
        matches!(self.state, PositionState::Open(_) | PositionState::PendingOpen(_))
    }

    pub fn journal(&self) -> &TradeJournal {
        &self.journal
    }

    /// Stage a new position before the exchange has acknowledged the entry
    /// order. Refusing a second open here is the state-machine invariant;
    /// hitting it means a logic error upstream and halts the symbol.
    pub fn begin_open(
        &mut self,
        side: Direction,
        plan: &EntryPlan,
        entry_confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<u64, StateError> {
        match &self.state {
            PositionState::Open(_) => {
                return Err(StateError::PositionAlreadyOpen {
                    symbol: self.symbol.clone(),
                })
            }
            PositionState::PendingOpen(_) => {
                return Err(StateError::EntryPending {
                    symbol: self.symbol.clone(),
                })
            }
            PositionState::NoPosition => {}
        }

        let id = self.journal.next_id();
        let trade = Trade::open(id, &self.symbol, side, plan, entry_confidence, now);
        self.state = PositionState::PendingOpen(trade);
        Ok(id)
    }

    /// The exchange confirmed the fill: promote to Open and journal it.
    pub fn confirm_open(&mut self, fill_price: f64) -> Result<&Trade, LifecycleError> {
        let PositionState::PendingOpen(mut trade) =
            std::mem::replace(&mut self.state, PositionState::NoPosition)
        else {
            return Err(StateError::NoPendingEntry {
                symbol: self.symbol.clone(),
            }
            .into());
        };

        trade.entry_price = fill_price;
        self.journal.append(trade.clone())?;
        self.state = PositionState::Open(trade);

        let PositionState::Open(trade) = &self.state else {
            unreachable!()
        };
        info!(
            "{}: trade #{} OPEN {} {:.6} @ {:.2} (SL {:.2})",
            self.symbol, trade.id, trade.side, trade.quantity, trade.entry_price,
            trade.stop_loss_price
        );
        Ok(trade)
    }

    /// The entry order failed or timed out: nothing was filled, nothing is
    /// journaled, and the machine returns to NoPosition.
    pub fn abort_open(&mut self) -> Result<(), StateError> {
        match self.state {
            PositionState::PendingOpen(_) => {
                self.state = PositionState::NoPosition;
                Ok(())
            }
            _ => Err(StateError::NoPendingEntry {
                symbol: self.symbol.clone(),
            }),
        }
    }

    /// Re-evaluate the open position against the latest price. All
    /// mutations are computed on a working copy and applied in one step at
    /// the end, so a trade is never visible mid-transition. Returns the
    /// trade when this update closed it.
    pub fn on_price_update(
        &mut self,
        price: f64,
        fee_rate: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>, LifecycleError> {
        let PositionState::Open(current) = &self.state else {
            return Ok(None);
        };
        let mut working = current.clone();
        let mut changed = false;

        // Stop-loss wins when both sides of the book were touched this
        // tick; a single price point has no intrabar ordering, so the
        // conservative outcome is taken.
        let stop_hit = match working.side {
            Direction::Long => price <= working.stop_loss_price,
            Direction::Short => price >= working.stop_loss_price,
        };

        if stop_hit {
            let stop_price = working.stop_loss_price;
            close_out(&mut working, ExitType::StopLoss, stop_price, fee_rate, now);
            self.journal.patch_open(&working)?;
            self.state = PositionState::NoPosition;
            let exit = working.exit.as_ref().expect("closed trade has an exit");
            info!(
                "{}: trade #{} CLOSED ({}) PnL {:+.2}",
                self.symbol, working.id, exit.exit_type, exit.realized_pnl
            );
            return Ok(Some(working));
        }

        // Fill every unhit ladder level the price has crossed favorably.
        let mut last_level_hit = None;
        for i in 0..working.take_profit_levels.len() {
            let level = working.take_profit_levels[i].clone();
            if level.hit {
                last_level_hit = Some(level.level);
                continue;
            }
            let crossed = match working.side {
                Direction::Long => price >= level.price,
                Direction::Short => price <= level.price,
            };
            if !crossed {
                continue;
            }

            let fill_quantity = (working.quantity * level.close_percent / 100.0)
                .min(working.remaining_quantity);
            if fill_quantity <= 0.0 {
                continue;
            }

            let gross = working.portion_pnl(level.price, fill_quantity);
            let fee = level.price * fill_quantity * fee_rate;
            working.remaining_quantity -= fill_quantity;
            working.take_profit_levels[i].hit = true;
            working.partial_fills.push(PartialFill {
                level: level.level,
                price: level.price,
                quantity: fill_quantity,
                pnl: gross - fee,
                time: now,
            });
            last_level_hit = Some(level.level);
            changed = true;
            info!(
                "{}: trade #{} TP{} filled {:.6} @ {:.2} PnL {:+.2}",
                self.symbol, working.id, level.level, fill_quantity, level.price, gross - fee
            );
        }

        // First profit secured: optionally stop risking the entry.
        if changed
            && self.settings.move_to_breakeven_on_tp1
            && !working.sl_moved_to_breakeven
        {
            working.stop_loss_price = working.entry_price;
            working.sl_moved_to_breakeven = true;
            info!(
                "{}: trade #{} stop moved to breakeven @ {:.2}",
                self.symbol, working.id, working.entry_price
            );
        }

        if working.remaining_quantity <= 1e-12 {
            let last = last_level_hit.unwrap_or(0);
            let exit_price = working
                .partial_fills
                .last()
                .map(|f| f.price)
                .unwrap_or(price);
            finalize(&mut working, ExitType::TakeProfit(last), exit_price, now);
            self.journal.patch_open(&working)?;
            self.state = PositionState::NoPosition;
            let exit = working.exit.as_ref().expect("closed trade has an exit");
            info!(
                "{}: trade #{} CLOSED ({}) PnL {:+.2}",
                self.symbol, working.id, exit.exit_type, exit.realized_pnl
            );
            return Ok(Some(working));
        }

        if changed {
            self.journal.patch_open(&working)?;
            self.state = PositionState::Open(working);
        }
        Ok(None)
    }

    /// Operator or risk override: close whatever remains at the current
    /// price, at any time while open.
    pub fn close_manual(
        &mut self,
        reason: &str,
        price: f64,
        fee_rate: f64,
        now: DateTime<Utc>,
    ) -> Result<Trade, LifecycleError> {
        let PositionState::Open(current) = &self.state else {
            return Err(StateError::NoOpenPosition {
                symbol: self.symbol.clone(),
            }
            .into());
        };
        let mut working = current.clone();
        working.manual_reason = Some(reason.to_string());
        close_out(&mut working, ExitType::Manual, price, fee_rate, now);
        self.journal.patch_open(&working)?;
        self.state = PositionState::NoPosition;
        info!(
            "{}: trade #{} closed manually ({})",
            self.symbol, working.id, reason
        );
        Ok(working)
    }
}

/// Exit the entire remaining quantity at `exit_price` and seal the trade.
fn close_out(
    trade: &mut Trade,
    exit_type: ExitType,
    exit_price: f64,
    fee_rate: f64,
    now: DateTime<Utc>,
) {
    let remaining = trade.remaining_quantity;
    let gross = trade.portion_pnl(exit_price, remaining);
    let fee = exit_price * remaining * fee_rate;
    trade.remaining_quantity = 0.0;
    let realized = trade.partial_pnl() + gross - fee;
    seal(trade, exit_type, exit_price, realized, now);
}

/// Seal a trade whose quantity already reached zero through TP fills.
fn finalize(trade: &mut Trade, exit_type: ExitType, exit_price: f64, now: DateTime<Utc>) {
    let realized = trade.partial_pnl();
    seal(trade, exit_type, exit_price, realized, now);
}

fn seal(
    trade: &mut Trade,
    exit_type: ExitType,
    exit_price: f64,
    realized_pnl: f64,
    now: DateTime<Utc>,
) {
    trade.status = TradeStatus::Closed;
    trade.closed_at = Some(now);
    trade.exit = Some(ExitCondition {
        exit_type,
        exit_price,
        realized_pnl,
        holding_time_secs: (now - trade.opened_at).num_seconds(),
    });
}
