use serde::{Deserialize, Serialize};

use crate::config::{RiskSettings, TpLevelSettings};
use crate::error::RiskError;
use crate::models::Direction;

/// One rung of a position's take-profit ladder, priced at entry time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeProfitLevel {
    pub level: u8,
    pub price: f64,
    /// Percent of the original quantity closed when this level fills.
    pub close_percent: f64,
    #[serde(default)]
    pub hit: bool,
}

/// Concrete entry parameters derived from a composite decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPlan {
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_loss_price: f64,
    pub take_profit_levels: Vec<TakeProfitLevel>,
    pub leverage: f64,
}

/// Converts a non-Hold decision into entry parameters under the account's
/// risk settings. The ladder shape is validated once at construction and
/// never silently normalized.
pub struct RiskSizer {
    settings: RiskSettings,
    ladder: Vec<TpLevelSettings>,
}

impl RiskSizer {
    pub fn new(settings: RiskSettings, ladder: Vec<TpLevelSettings>) -> Result<Self, RiskError> {
        if ladder.is_empty() {
            return Err(RiskError::LadderEmpty);
        }
        let sum: f64 = ladder.iter().map(|l| l.close_percent).sum();
        if (sum - 100.0).abs() > 1e-9 {
            return Err(RiskError::LadderSumNot100 { sum });
        }
        for pair in ladder.windows(2) {
            if pair[1].price_offset_percent <= pair[0].price_offset_percent {
                return Err(RiskError::LadderNotMonotonic {
                    level: pair[1].level,
                    prev: pair[0].level,
                });
            }
        }
        Ok(Self { settings, ladder })
    }

    /// Build the entry plan. `min_qty_step` comes from the exchange
    /// collaborator; it is queried, never computed here.
    pub fn size(
        &self,
        direction: Direction,
        entry_price: f64,
        min_qty_step: f64,
    ) -> Result<EntryPlan, RiskError> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(RiskError::BadEntryPrice { price: entry_price });
        }

        let sl_pct = self.settings.stop_loss_percent;
        if sl_pct <= 0.0 {
            return Err(RiskError::StopDistanceNonPositive { distance_pct: sl_pct });
        }
        if sl_pct > self.settings.max_stop_loss_percent {
            return Err(RiskError::StopDistanceTooWide {
                distance_pct: sl_pct,
                max_pct: self.settings.max_stop_loss_percent,
            });
        }

        let stop_loss_price = match direction {
            Direction::Long => entry_price * (1.0 - sl_pct / 100.0),
            Direction::Short => entry_price * (1.0 + sl_pct / 100.0),
        };

        let raw_quantity =
            self.settings.position_size_usdt * self.settings.leverage / entry_price;
        let quantity = (raw_quantity / min_qty_step).floor() * min_qty_step;
        if quantity <= 0.0 {
            return Err(RiskError::QuantityRoundsToZero { step: min_qty_step });
        }

        let take_profit_levels = self
            .ladder
            .iter()
            .map(|l| {
                let price = match direction {
                    Direction::Long => entry_price * (1.0 + l.price_offset_percent / 100.0),
                    Direction::Short => entry_price * (1.0 - l.price_offset_percent / 100.0),
                };
                TakeProfitLevel {
                    level: l.level,
                    price,
                    close_percent: l.close_percent,
                    hit: false,
                }
            })
            .collect();

        Ok(EntryPlan {
            entry_price,
            quantity,
            stop_loss_price,
            take_profit_levels,
            leverage: self.settings.leverage,
        })
    }
}
