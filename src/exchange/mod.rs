pub mod sim;

pub use sim::{SimCandleProvider, SimExchange};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CandleSeries;

/// Acknowledgement of an accepted entry order. Carries the actual fill
/// price, which may differ from the decision price through slippage.
#[derive(Debug, Clone, Copy)]
pub struct OrderAck {
    pub fill_price: f64,
    pub quantity: f64,
}

/// Candle windows for the three timeframes a decision cycle consumes.
#[derive(Debug, Clone, Default)]
pub struct MultiTimeframeCandles {
    pub m1: CandleSeries,
    pub m5: CandleSeries,
    pub m15: CandleSeries,
}

/// Order-side collaborator. The decision engine only knows this trait;
/// live venues and simulations plug in behind it.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Submit a market entry order for `quantity` of `symbol`.
    async fn place_entry_order(
        &mut self,
        symbol: &str,
        side: crate::models::Direction,
        quantity: f64,
    ) -> Result<OrderAck>;

    /// Smallest quantity increment the venue accepts for `symbol`.
    async fn min_qty_step(&self, symbol: &str) -> Result<f64>;

    /// Current funding rate for `symbol`, if the venue publishes one.
    async fn funding_rate(&self, symbol: &str) -> Result<Option<f64>>;

    async fn current_price(&mut self, symbol: &str) -> Result<f64>;

    /// Taker fee rate as a fraction of notional (0.0005 = 5 bps).
    async fn fee_rate(&self) -> Result<f64>;

    /// The venue's own realized PnL for a closed trade, used for
    /// reconciliation. None when the venue has no record yet.
    async fn closed_pnl(&self, symbol: &str, trade_id: u64) -> Result<Option<f64>>;
}

/// Market-data collaborator, kept separate from order flow so that data
/// can come from a different source than execution.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Fetch the decision windows for `symbol`. Implementations must
    /// return candles sorted oldest-first and fail rather than return a
    /// window shorter than `min_candles`.
    async fn load_candles(&mut self, symbol: &str, min_candles: usize)
        -> Result<MultiTimeframeCandles>;
}
