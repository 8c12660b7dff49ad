//! E2E test: daemon start-up, polling and shutdown against the paper exchange.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tradegate_domain::{ExchangeProperties, Market, Ticker};
use tradegate_exec::{ConnectorError, ExecError, StubConnector};
use tradegated::{Config, Daemon, DaemonError};

#[tokio::test(start_paused = true)]
async fn test_daemon_polls_until_cancelled() -> anyhow::Result<()> {
    let connector = Arc::new(StubConnector::paper());
    let daemon = Daemon::new_stub(Config::test(), connector.clone())?;
    let shutdown = daemon.shutdown_token();

    let handle = tokio::spawn(daemon.run());

    // Start-up fetch + ticks at 0s, 1s, 2s
    tokio::time::sleep(Duration::from_millis(2500)).await;
    shutdown.cancel();
    handle.await??;

    assert_eq!(connector.calls(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_daemon_survives_failed_polls() -> anyhow::Result<()> {
    let connector = Arc::new(StubConnector::paper());
    let daemon = Daemon::new_stub(Config::test(), connector.clone())?;
    let shutdown = daemon.shutdown_token();

    let handle = tokio::spawn(daemon.run());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A fatal error on the next poll does not stop the loop
    connector.fail_next(ConnectorError::Rejected("maintenance".to_string()));
    connector.set_ticker("BTC", "USDT", Ticker { bid: dec!(1), ask: dec!(2), last: dec!(1.5) });
    tokio::time::sleep(Duration::from_millis(2000)).await;

    shutdown.cancel();
    handle.await??;

    // Start-up fetch + ticks at 0s, 1s (failed), 2s
    assert_eq!(connector.calls(), 4);
    Ok(())
}

#[tokio::test]
async fn test_unknown_market_aborts_startup() {
    let connector = Arc::new(StubConnector::new(ExchangeProperties::new(vec![Market::new(
        "ETH",
        "USDT",
        dec!(0.01),
        4,
    )])));
    let daemon = Daemon::new_stub(Config::test(), connector).unwrap();

    let err = daemon.run().await.unwrap_err();
    assert!(matches!(err, DaemonError::Exec(ExecError::Market(_))));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_exchange_aborts_startup_after_retries() {
    let connector = Arc::new(StubConnector::paper());
    for _ in 0..3 {
        connector.fail_next(ConnectorError::transient("connection refused"));
    }
    let daemon = Daemon::new_stub(Config::test(), connector.clone()).unwrap();

    let err = daemon.run().await.unwrap_err();
    assert!(matches!(err, DaemonError::Exec(ExecError::RetriesExhausted { attempts: 3, .. })));
    assert_eq!(connector.calls(), 3);
}
