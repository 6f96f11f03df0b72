mod bot;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use fusion_trading_bot::config::Config;
use fusion_trading_bot::exchange::{SimCandleProvider, SimExchange};

use crate::bot::FusionBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let exchange = Box::new(SimExchange::new());
    let data = Box::new(SimCandleProvider::new());
    let shared_config = cfg.shared();

    let mut bot = FusionBot::new(shared_config, exchange, data).await?;
    bot.run().await?;

    Ok(())
}
