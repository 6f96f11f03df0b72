use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::exchange::{CandleProvider, Exchange, MultiTimeframeCandles, OrderAck};
use crate::models::{CandleSeries, Direction};

/// An Exchange that fills everything instantly at a driven price. Used by
/// the integration tests and dry runs; no I/O, fully deterministic.
pub struct SimExchange {
    prices: HashMap<String, f64>,
    funding_rates: HashMap<String, f64>,
    closed_pnls: HashMap<(String, u64), f64>,
    min_qty_step: f64,
    fee_rate: f64,
    /// Entry fills move this fraction against the order, zero by default.
    slippage: f64,
    pub orders_placed: Vec<(String, Direction, f64)>,
}

impl SimExchange {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            funding_rates: HashMap::new(),
            closed_pnls: HashMap::new(),
            min_qty_step: 0.001,
            fee_rate: 0.0005,
            slippage: 0.0,
            orders_placed: Vec::new(),
        }
    }

    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub fn set_funding_rate(&mut self, symbol: &str, rate: f64) {
        self.funding_rates.insert(symbol.to_string(), rate);
    }

    pub fn set_closed_pnl(&mut self, symbol: &str, trade_id: u64, pnl: f64) {
        self.closed_pnls.insert((symbol.to_string(), trade_id), pnl);
    }

    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = slippage;
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = fee_rate;
        self
    }
}

impl Default for SimExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exchange for SimExchange {
    async fn place_entry_order(
        &mut self,
        symbol: &str,
        side: Direction,
        quantity: f64,
    ) -> Result<OrderAck> {
        let price = *self
            .prices
            .get(symbol)
            .with_context(|| format!("no simulated price for {symbol}"))?;
        // Slippage is always adverse to the order.
        let fill_price = price * (1.0 + self.slippage * side.sign());
        self.orders_placed.push((symbol.to_string(), side, quantity));
        Ok(OrderAck {
            fill_price,
            quantity,
        })
    }

    async fn min_qty_step(&self, _symbol: &str) -> Result<f64> {
        Ok(self.min_qty_step)
    }

    async fn funding_rate(&self, symbol: &str) -> Result<Option<f64>> {
        Ok(self.funding_rates.get(symbol).copied())
    }

    async fn current_price(&mut self, symbol: &str) -> Result<f64> {
        self.prices
            .get(symbol)
            .copied()
            .with_context(|| format!("no simulated price for {symbol}"))
    }

    async fn fee_rate(&self) -> Result<f64> {
        Ok(self.fee_rate)
    }

    async fn closed_pnl(&self, symbol: &str, trade_id: u64) -> Result<Option<f64>> {
        Ok(self
            .closed_pnls
            .get(&(symbol.to_string(), trade_id))
            .copied())
    }
}

/// A CandleProvider backed by pre-loaded windows, one set per symbol.
pub struct SimCandleProvider {
    data: HashMap<String, MultiTimeframeCandles>,
}

impl SimCandleProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn load(&mut self, symbol: &str, candles: MultiTimeframeCandles) {
        self.data.insert(symbol.to_string(), candles);
    }

    /// Shorthand for tests that drive all three timeframes off one series.
    pub fn load_uniform(&mut self, symbol: &str, series: CandleSeries) {
        self.load(
            symbol,
            MultiTimeframeCandles {
                m1: series.clone(),
                m5: series.clone(),
                m15: series,
            },
        );
    }
}

impl Default for SimCandleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleProvider for SimCandleProvider {
    async fn load_candles(
        &mut self,
        symbol: &str,
        min_candles: usize,
    ) -> Result<MultiTimeframeCandles> {
        let candles = self
            .data
            .get(symbol)
            .with_context(|| format!("no simulated candles for {symbol}"))?;
        for (name, series) in [
            ("1m", &candles.m1),
            ("5m", &candles.m5),
            ("15m", &candles.m15),
        ] {
            if series.len() < min_candles {
                bail!(
                    "{symbol}: {name} window has {} candles, need at least {min_candles}",
                    series.len()
                );
            }
        }
        Ok(candles.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_bullish_trend;

    #[tokio::test]
    async fn entry_order_fills_at_driven_price() {
        let mut ex = SimExchange::new();
        ex.set_price("BTCUSDT", 50_000.0);

        let ack = ex
            .place_entry_order("BTCUSDT", Direction::Long, 0.01)
            .await
            .unwrap();
        assert!((ack.fill_price - 50_000.0).abs() < 1e-9);
        assert_eq!(ex.orders_placed.len(), 1);
    }

    #[tokio::test]
    async fn slippage_is_adverse_for_both_sides() {
        let mut ex = SimExchange::new().with_slippage(0.001);
        ex.set_price("BTCUSDT", 100.0);

        let long = ex
            .place_entry_order("BTCUSDT", Direction::Long, 1.0)
            .await
            .unwrap();
        assert!(long.fill_price > 100.0);

        let short = ex
            .place_entry_order("BTCUSDT", Direction::Short, 1.0)
            .await
            .unwrap();
        assert!(short.fill_price < 100.0);
    }

    #[tokio::test]
    async fn unknown_symbol_errors() {
        let mut ex = SimExchange::new();
        assert!(ex.current_price("DOGEUSDT").await.is_err());
    }

    #[tokio::test]
    async fn provider_enforces_minimum_window() {
        let mut provider = SimCandleProvider::new();
        provider.load_uniform("BTCUSDT", make_bullish_trend(10, 100.0));

        assert!(provider.load_candles("BTCUSDT", 50).await.is_err());
        assert!(provider.load_candles("BTCUSDT", 10).await.is_ok());
    }

    #[tokio::test]
    async fn funding_rate_absent_when_not_set() {
        let ex = SimExchange::new();
        assert_eq!(ex.funding_rate("BTCUSDT").await.unwrap(), None);
    }
}
