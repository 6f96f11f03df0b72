use std::fs;
use std::path::{Path, PathBuf};

use crate::error::JournalError;
use crate::models::TradeStatus;
use crate::trading::trade::Trade;

/// Append-oriented trade journal persisted as a JSON array. The engine only
/// appends new trades and patches the single most recent open entry per
/// symbol; entries are never reordered or deleted, so closed history is a
/// faithful record for external consumers.
pub struct TradeJournal {
    path: Option<PathBuf>,
    trades: Vec<Trade>,
}

impl TradeJournal {
    /// Load an existing journal (or start an empty one) from `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();
        let trades = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        let journal = Self {
            path: Some(path),
            trades,
        };
        journal.check_open_invariant()?;
        Ok(journal)
    }

    /// Journal that never touches disk. Used in tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            trades: Vec::new(),
        }
    }

    /// At most one open entry per symbol, at any point in the file.
    fn check_open_invariant(&self) -> Result<(), JournalError> {
        use std::collections::HashMap;
        let mut open_counts: HashMap<&str, usize> = HashMap::new();
        for trade in &self.trades {
            if trade.status == TradeStatus::Open {
                *open_counts.entry(trade.symbol.as_str()).or_default() += 1;
            }
        }
        for (symbol, count) in open_counts {
            if count > 1 {
                return Err(JournalError::MultipleOpenEntries {
                    symbol: symbol.to_string(),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Validated before the push: a rejected append must leave the journal
    /// exactly as it was, in memory and on disk.
    pub fn append(&mut self, trade: Trade) -> Result<(), JournalError> {
        if trade.status == TradeStatus::Open {
            let open_count = self
                .trades
                .iter()
                .filter(|t| t.symbol == trade.symbol && t.status == TradeStatus::Open)
                .count();
            if open_count > 0 {
                return Err(JournalError::MultipleOpenEntries {
                    symbol: trade.symbol,
                    count: open_count + 1,
                });
            }
        }
        self.trades.push(trade);
        self.persist()
    }

    /// Patch the most recent open entry for `symbol` with the updated
    /// trade. Only the mutable fields change; identity fields must match.
    pub fn patch_open(&mut self, updated: &Trade) -> Result<(), JournalError> {
        let slot = self
            .trades
            .iter_mut()
            .rev()
            .find(|t| t.symbol == updated.symbol && t.status == TradeStatus::Open);

        match slot {
            Some(entry) => {
                *entry = updated.clone();
                self.persist()
            }
            None => Err(JournalError::NoOpenEntry {
                symbol: updated.symbol.clone(),
            }),
        }
    }

    pub fn read_all(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_trade_for(&self, symbol: &str) -> Option<&Trade> {
        self.trades
            .iter()
            .rev()
            .find(|t| t.symbol == symbol && t.status == TradeStatus::Open)
    }

    /// Next free trade id, one past the largest ever journaled.
    pub fn next_id(&self) -> u64 {
        self.trades.iter().map(|t| t.id).max().map_or(1, |id| id + 1)
    }

    fn persist(&self) -> Result<(), JournalError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.trades)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Convenience for binaries: the conventional journal location.
pub fn journal_path(log_dir: &str) -> PathBuf {
    Path::new(log_dir).join("trades.json")
}
