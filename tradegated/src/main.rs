//! Tradegate Daemon
//!
//! Runs the exchange facade for one market and polls its ticker.
//!
//! # Usage
//!
//! ```bash
//! # Start against the paper exchange
//! cargo run -p tradegated
//!
//! # Start against the Binance testnet
//! TRADEGATE_EXCHANGE=binance BINANCE_TESTNET=true cargo run -p tradegated
//! ```
//!
//! # Environment Variables
//!
//! - `TRADEGATE_ENV`: Environment (test, development, production)
//! - `TRADEGATE_EXCHANGE`: Connector (binance, paper; default: paper)
//! - `TRADEGATE_ASSET_A` / `TRADEGATE_ASSET_B`: Active pair (default: BTC/USDT)
//! - `TRADEGATE_RETRY_MAX`: Retries after the first attempt (default: 30)
//! - `TRADEGATE_RETRY_FACTOR`: Backoff factor (default: 1.5)
//! - `TRADEGATE_RETRY_MIN_DELAY_MS` / `TRADEGATE_RETRY_MAX_DELAY_MS`: Backoff bounds (default: 1000 / 8000)
//! - `TRADEGATE_POLL_INTERVAL_SECS`: Ticker poll interval (default: 10)
//! - `BINANCE_API_KEY` / `BINANCE_API_SECRET` / `BINANCE_TESTNET`: Binance credentials
//! - `KEY_VAULT_ENDPOINT` / `KEY_ID` / `CLONE_ID` / `ACCESS_TOKEN`: Remote signer

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tradegated::{Config, Daemon};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tradegated=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        exchange = %config.exchange.kind,
        asset_a = %config.exchange.asset_a,
        asset_b = %config.exchange.asset_b,
        "Tradegate Daemon"
    );

    // Create and run daemon
    let daemon = Daemon::from_config(config)?;
    daemon.run().await?;

    Ok(())
}
