//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together the configured connector, the signing service
//! and the exchange facade for the active market.
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build signer and connector for the configured `ConnectorKind`
//! 3. Resolve the active market (configuration errors abort start-up)
//! 4. Poll the ticker every interval
//! 5. Graceful shutdown on SIGINT or cancellation

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tradegate_connectors::{BinanceConnector, HmacSigner, KeyVaultSigner};
use tradegate_domain::MarketContext;
use tradegate_exec::{ConnectorPort, ExchangeFacade, SigningPort, StubConnector};

use crate::config::{Config, ConnectorKind};
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main Tradegate daemon.
pub struct Daemon<C: ConnectorPort + ?Sized> {
    /// Configuration
    config: Config,
    /// Facade over the active market
    facade: ExchangeFacade<C>,
    /// Stops the poll loop and interrupts retries
    shutdown: CancellationToken,
}

impl Daemon<dyn ConnectorPort> {
    /// Create a daemon with the connector and signer selected by `config`.
    pub fn from_config(config: Config) -> DaemonResult<Self> {
        let market = MarketContext::new(&config.exchange.asset_a, &config.exchange.asset_b)?;
        let signer = build_signer(&config)?;

        let connector: Arc<dyn ConnectorPort> = match config.exchange.kind {
            ConnectorKind::Binance => {
                let signer = signer.clone().ok_or_else(|| {
                    DaemonError::Config(
                        "Binance requires BINANCE_API_KEY and BINANCE_API_SECRET or KEY_VAULT_ENDPOINT"
                            .to_string(),
                    )
                })?;

                if config.binance.testnet {
                    Arc::new(BinanceConnector::testnet(signer, market.clone()))
                } else {
                    Arc::new(BinanceConnector::new(signer, market.clone()))
                }
            },
            ConnectorKind::Paper => Arc::new(StubConnector::paper()),
        };

        Self::new(config, connector, market, signer)
    }
}

impl Daemon<StubConnector> {
    /// Create a daemon over a paper exchange (for testing/development).
    pub fn new_stub(config: Config, connector: Arc<StubConnector>) -> DaemonResult<Self> {
        let market = MarketContext::new(&config.exchange.asset_a, &config.exchange.asset_b)?;
        Self::new(config, connector, market, None)
    }
}

impl<C: ConnectorPort + ?Sized> Daemon<C> {
    /// Create a daemon with provided components.
    pub fn new(
        config: Config,
        connector: Arc<C>,
        market: MarketContext,
        signer: Option<Arc<dyn SigningPort>>,
    ) -> DaemonResult<Self> {
        let shutdown = CancellationToken::new();
        let policy = config.retry.policy()?;

        let mut facade =
            ExchangeFacade::new(connector, market, policy).with_cancellation(shutdown.clone());
        if let Some(signer) = signer {
            facade = facade.with_signer(signer);
        }

        Ok(Self { config, facade, shutdown })
    }

    /// Token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn facade(&self) -> &ExchangeFacade<C> {
        &self.facade
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT or the
    /// shutdown token).
    pub async fn run(self) -> DaemonResult<()> {
        let run_id = Uuid::now_v7();
        info!(
            %run_id,
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            connector = self.facade.connector().name(),
            market = %self.facade.market(),
            "Starting Tradegate daemon"
        );

        // 1. Resolve the active market
        let market = self.facade.market_config().await.map_err(|e| {
            error!(error = %e, "Cannot resolve active market");
            DaemonError::from(e)
        })?;
        info!(
            pair = %format!("{}/{}", market.asset_a(), market.asset_b()),
            min_amount = %market.minimal_order.amount,
            max_decimals = market.max_decimals,
            "Market resolved"
        );

        // 2. Poll loop
        let mut interval = tokio::time::interval(self.config.exchange.poll_interval);
        info!(interval = ?self.config.exchange.poll_interval, "Entering poll loop");

        loop {
            tokio::select! {
                // A poll in flight is dropped on shutdown
                _ = async {
                    interval.tick().await;
                    self.poll_ticker().await;
                } => {}

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                // Handle shutdown signals
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    self.shutdown.cancel();
                    break;
                }
            }
        }

        info!(%run_id, "Daemon stopped");
        Ok(())
    }

    async fn poll_ticker(&self) {
        match self.facade.ticker().await {
            Ok(ticker) => {
                info!(bid = %ticker.bid, ask = %ticker.ask, last = %ticker.last, "Ticker");
            },
            Err(e) if e.is_acknowledged() => {
                debug!(reason = %e, "Ticker request acknowledged without data");
            },
            Err(e) => {
                if self.shutdown.is_cancelled() {
                    debug!(error = %e, "Ticker poll interrupted by shutdown");
                } else {
                    warn!(error = %e, "Ticker poll failed");
                }
            },
        }
    }
}

/// Pick the signing service: the key vault when configured, otherwise a
/// local HMAC signer when Binance credentials are present.
fn build_signer(config: &Config) -> DaemonResult<Option<Arc<dyn SigningPort>>> {
    if let Some(vault) = &config.key_vault {
        info!(endpoint = %vault.endpoint, "Using key vault signer");
        let signer = KeyVaultSigner::new(vault.clone(), config.retry.policy()?);
        return Ok(Some(Arc::new(signer)));
    }

    match (&config.binance.api_key, &config.binance.api_secret) {
        (Some(key), Some(secret)) => {
            info!("Using local HMAC signer");
            Ok(Some(Arc::new(HmacSigner::new(key.clone(), secret.clone()))))
        },
        (None, None) => Ok(None),
        _ => Err(DaemonError::Config(
            "BINANCE_API_KEY and BINANCE_API_SECRET must be set together".to_string(),
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinanceConfig;
    use tradegate_connectors::KeyVaultConfig;

    #[test]
    fn test_build_signer_none_without_credentials() {
        assert!(build_signer(&Config::test()).unwrap().is_none());
    }

    #[test]
    fn test_build_signer_requires_both_credentials() {
        let mut config = Config::test();
        config.binance = BinanceConfig {
            api_key: Some("key".to_string()),
            api_secret: None,
            testnet: false,
        };

        assert!(matches!(build_signer(&config), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_build_signer_prefers_key_vault() {
        let mut config = Config::test();
        config.key_vault = Some(KeyVaultConfig {
            endpoint: "http://vault.local/graphql".to_string(),
            key_id: None,
            clone_id: None,
            access_token: None,
        });

        assert!(build_signer(&config).unwrap().is_some());
    }

    #[test]
    fn test_binance_without_signer_is_rejected() {
        let mut config = Config::test();
        config.exchange.kind = ConnectorKind::Binance;

        assert!(matches!(Daemon::from_config(config), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_binance_with_credentials_builds() {
        let mut config = Config::test();
        config.exchange.kind = ConnectorKind::Binance;
        config.binance = BinanceConfig {
            api_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            testnet: true,
        };

        let daemon = Daemon::from_config(config).unwrap();
        assert_eq!(daemon.facade().connector().name(), "binance");
    }

    #[test]
    fn test_blank_asset_is_rejected() {
        let mut config = Config::test();
        config.exchange.asset_a = "  ".to_string();

        assert!(matches!(Daemon::from_config(config), Err(DaemonError::Domain(_))));
    }
}
