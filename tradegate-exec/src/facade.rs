//! Facade: the single entry point agents use to talk to an exchange.
//!
//! Composes market resolution, truncation and validation from the engine
//! with the retry loop, around one connector and one active market.
//!
//! # Flow
//!
//! ```text
//! put_position → exchange_properties → resolve_market → truncate → validate → buy/sell
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tradegate_domain::{
    ExchangeProperties, Market, MarketContext, OrderId, OrderType, Position, PublicTrade,
    Signature, Ticker, Trade,
};
use tradegate_engine::{resolve_market, truncate, validate_order, Capabilities, OrderCheck};

use crate::error::{ExecError, ExecResult};
use crate::ports::{classify, ConnectorError, ConnectorPort, SigningPort};
use crate::retry::{Completion, RetryExecutor, RetryPolicy};

// =============================================================================
// Exchange Facade
// =============================================================================

/// Exchange operations for one active market.
///
/// Reads go through the [`RetryExecutor`]; order submissions run exactly
/// once. Every failure leaves as an [`ExecError`].
pub struct ExchangeFacade<C: ConnectorPort + ?Sized> {
    /// Exchange adapter
    connector: Arc<C>,
    /// Active trading pair
    market: MarketContext,
    /// Retry loop for reads
    retry: RetryExecutor,
    /// Optional signing service
    signer: Option<Arc<dyn SigningPort>>,
    /// Optional shutdown token, interrupts backoff waits
    cancel: Option<CancellationToken>,
}

impl<C: ConnectorPort + ?Sized> ExchangeFacade<C> {
    /// Create a facade over `connector` for `market`.
    pub fn new(connector: Arc<C>, market: MarketContext, policy: RetryPolicy) -> Self {
        Self {
            connector,
            market,
            retry: RetryExecutor::new(policy),
            signer: None,
            cancel: None,
        }
    }

    /// Attach a signing service.
    pub fn with_signer(mut self, signer: Arc<dyn SigningPort>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Stop retrying once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn market(&self) -> &MarketContext {
        &self.market
    }

    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    // -------------------------------------------------------------------------
    // Market configuration
    // -------------------------------------------------------------------------

    /// Fetch the exchange's market snapshot.
    ///
    /// Fails with an error when the connector cannot deliver one; an empty
    /// snapshot is only returned if the exchange really lists no markets.
    pub async fn exchange_properties(&self) -> ExecResult<ExchangeProperties> {
        let connector = &self.connector;
        self.read("exchange_properties", move || async move {
            connector.exchange_properties().await
        })
        .await
    }

    /// Configuration record of the active market.
    pub async fn market_config(&self) -> ExecResult<Market> {
        let properties = self.exchange_properties().await?;
        let market = resolve_market(&properties, self.market.asset_a(), self.market.asset_b())?;
        Ok(market.clone())
    }

    /// Number of fractional digits the active market accepts.
    pub async fn max_decimal_positions(&self) -> ExecResult<u32> {
        Ok(self.market_config().await?.max_decimals)
    }

    /// Truncate `value` to the active market's precision.
    pub async fn truncate(&self, value: Decimal) -> ExecResult<Decimal> {
        let decimals = self.max_decimal_positions().await?;
        Ok(truncate(value, decimals))
    }

    // -------------------------------------------------------------------------
    // Market data
    // -------------------------------------------------------------------------

    /// Best bid, best ask and last price of the active market.
    pub async fn ticker(&self) -> ExecResult<Ticker> {
        let connector = &self.connector;
        let market = &self.market;
        self.read("ticker", move || async move { connector.ticker(market).await }).await
    }

    /// Our resting orders on the active market.
    pub async fn open_positions(&self) -> ExecResult<Vec<Position>> {
        let connector = &self.connector;
        let market = &self.market;
        self.read("open_positions", move || async move { connector.open_positions(market).await })
            .await
    }

    /// Executions of one of our orders.
    pub async fn executed_trades(&self, position_id: &str) -> ExecResult<Vec<Trade>> {
        let connector = &self.connector;
        self.read("executed_trades", move || async move {
            connector.executed_trades(position_id).await
        })
        .await
    }

    /// Public trades of a pair between `start` and `end`.
    pub async fn public_trade_history(
        &self,
        asset_a: &str,
        asset_b: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ExecResult<Vec<PublicTrade>> {
        let connector = &self.connector;
        self.read("public_trade_history", move || async move {
            connector.public_trade_history(asset_a, asset_b, start, end).await
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Place a limit order on the active market.
    ///
    /// Rate and amounts are truncated to the market's precision, then the
    /// order `{amount: amount_b, price: rate}` is validated. A rejected order
    /// never reaches the connector.
    pub async fn put_position(
        &self,
        order_type: OrderType,
        rate: Decimal,
        amount_a: Decimal,
        amount_b: Decimal,
    ) -> ExecResult<OrderId> {
        let market = self.market_config().await?;
        let decimals = market.max_decimals;

        let rate = truncate(rate, decimals);
        let amount_a = truncate(amount_a, decimals);
        let amount_b = truncate(amount_b, decimals);

        let check = OrderCheck { amount: amount_b, price: rate };
        let capabilities =
            Capabilities::new(self.connector.price_check(), self.connector.lot_check());

        let result = validate_order(&check, &market, capabilities);
        if let Some(reason) = result.reason() {
            warn!(
                market = %self.market,
                %order_type,
                %rate,
                amount = %amount_b,
                %reason,
                "Order rejected before submission"
            );
            return Err(ExecError::InvalidOrder(reason));
        }

        info!(
            market = %self.market,
            %order_type,
            %rate,
            %amount_a,
            %amount_b,
            "Submitting order"
        );

        let (asset_a, asset_b) = (self.market.asset_a(), self.market.asset_b());
        let submitted = match order_type {
            OrderType::Buy => self.connector.buy(asset_a, asset_b, rate, amount_b).await,
            OrderType::Sell => self.connector.sell(asset_a, asset_b, rate, amount_b).await,
        };

        let order_id = Self::once("put_position", submitted)?;
        info!(%order_id, "Order placed");
        Ok(order_id)
    }

    /// Replace a resting order with a new rate and amount.
    pub async fn move_position(
        &self,
        position: &Position,
        new_rate: Decimal,
        new_amount_b: Decimal,
    ) -> ExecResult<OrderId> {
        let decimals = self.max_decimal_positions().await?;
        let new_rate = truncate(new_rate, decimals);
        let new_amount_b = truncate(new_amount_b, decimals);

        info!(
            position_id = %position.id,
            %new_rate,
            %new_amount_b,
            "Moving order"
        );

        let moved = self.connector.move_position(position, new_rate, new_amount_b).await;
        let order_id = Self::once("move_position", moved)?;
        info!(previous = %position.id, %order_id, "Order moved");
        Ok(order_id)
    }

    // -------------------------------------------------------------------------
    // Signing
    // -------------------------------------------------------------------------

    /// Sign `payload` with the attached signing service.
    pub async fn sign(&self, payload: &str) -> ExecResult<Signature> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| ExecError::Config("No signing service configured".to_string()))?;

        signer.sign(payload).await.map_err(|e| {
            error!(error = %e, "Signing failed");
            ExecError::from(e)
        })
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Run a connector read under the retry policy.
    async fn read<T, F, Fut>(&self, label: &str, mut call: F) -> ExecResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        let attempt = || {
            let pending = call();
            async move { classify(pending.await) }
        };

        let completion = match &self.cancel {
            Some(token) => self.retry.execute_with_cancel(label, attempt, token).await,
            None => self.retry.execute(label, attempt).await,
        };

        match completion {
            Ok(Completion::Value(value)) => Ok(value),
            Ok(Completion::Settled(reason)) => {
                debug!(operation = label, %reason, "Exchange acknowledged request");
                Err(ExecError::Acknowledged(reason.to_string()))
            },
            Err(e) => {
                error!(operation = label, attempts = e.attempts(), error = %e, "Exchange call failed");
                Err(e.into())
            },
        }
    }

    /// Normalize the result of a call made exactly once.
    fn once<T>(label: &str, result: Result<T, ConnectorError>) -> ExecResult<T> {
        result.map_err(|e| match e {
            ConnectorError::Acknowledged(message) => {
                debug!(operation = label, %message, "Exchange acknowledged request");
                ExecError::Acknowledged(message)
            },
            other => {
                error!(operation = label, error = %other, "Exchange call failed");
                ExecError::Exchange(other)
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StubConnector, StubSigner};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tradegate_engine::{EngineError, RejectReason};

    fn btc_usdt() -> MarketContext {
        MarketContext::new("BTC", "USDT").unwrap()
    }

    fn connector() -> Arc<StubConnector> {
        Arc::new(StubConnector::new(ExchangeProperties::new(vec![Market::new(
            "BTC",
            "USDT",
            dec!(0.001),
            2,
        )])))
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(3, 1.5, Duration::from_millis(10), Duration::from_millis(50)).unwrap()
    }

    #[tokio::test]
    async fn test_put_position_rejects_small_amount() {
        let connector = connector();
        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());

        let result = facade.put_position(OrderType::Buy, dec!(100.456), dec!(0.05), dec!(0.0005)).await;

        match result {
            Err(ExecError::InvalidOrder(reason)) => {
                assert_eq!(reason, RejectReason::AmountTooSmall);
                assert_eq!(reason.to_string(), "Amount is too small");
            },
            other => panic!("expected InvalidOrder, got {:?}", other),
        }
        // Only the properties fetch reached the exchange
        assert_eq!(connector.calls(), 1);
        assert!(connector.positions().is_empty());
    }

    #[tokio::test]
    async fn test_put_position_truncates_before_submission() {
        let connector = connector();
        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());

        let id = facade.put_position(OrderType::Sell, dec!(100.456), dec!(1.999), dec!(2.019)).await.unwrap();
        assert_eq!(id, "PAPER-1");

        let placed = connector.positions().pop().unwrap();
        assert_eq!(placed.order_type, OrderType::Sell);
        assert_eq!(placed.rate, dec!(100.45));
        assert_eq!(placed.amount_b, dec!(2.01));
    }

    #[tokio::test]
    async fn test_put_position_consults_capabilities() {
        let connector = Arc::new(
            StubConnector::new(ExchangeProperties::new(vec![Market::new("BTC", "USDT", dec!(0.001), 2)]))
                .with_tick_size(dec!(0.5))
                .with_min_notional(dec!(10)),
        );
        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());

        let price = facade.put_position(OrderType::Buy, dec!(100.25), dec!(0), dec!(1)).await;
        assert!(matches!(price, Err(ExecError::InvalidOrder(RejectReason::InvalidPrice))));

        let lot = facade.put_position(OrderType::Buy, dec!(100.5), dec!(0), dec!(0.05)).await;
        assert!(matches!(lot, Err(ExecError::InvalidOrder(RejectReason::LotTooSmall))));

        assert!(facade.put_position(OrderType::Buy, dec!(100.5), dec!(0), dec!(0.1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_put_position_is_not_retried() {
        let connector = connector();
        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());

        // Properties fetch recovers, the order submission fails once
        connector.fail_next(ConnectorError::transient("reset"));
        connector.fail_next_order(ConnectorError::transient("order timeout"));
        let result = facade.put_position(OrderType::Buy, dec!(100), dec!(0), dec!(0.01)).await;

        match result {
            Err(ExecError::Exchange(ConnectorError::Transient { message, .. })) => {
                assert_eq!(message, "order timeout");
            }
            other => panic!("expected transient submission error, got {:?}", other),
        }
        assert_eq!(connector.order_calls(), 1);
        // 2 property attempts + 1 submission
        assert_eq!(connector.calls(), 3);
        assert!(connector.positions().is_empty());
    }

    #[tokio::test]
    async fn test_market_config_unknown_pair() {
        let facade = ExchangeFacade::new(
            connector(),
            MarketContext::new("ETH", "EUR").unwrap(),
            quick_policy(),
        );

        let result = facade.market_config().await;
        assert!(matches!(result, Err(ExecError::Market(EngineError::MarketNotFound { .. }))));
    }

    #[tokio::test]
    async fn test_truncate_uses_market_precision() {
        let facade = ExchangeFacade::new(connector(), btc_usdt(), quick_policy());
        assert_eq!(facade.max_decimal_positions().await.unwrap(), 2);
        assert_eq!(facade.truncate(dec!(0.129)).await.unwrap(), dec!(0.12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_retries_transient_failures() {
        let connector = connector();
        connector.set_ticker("BTC", "USDT", Ticker { bid: dec!(1), ask: dec!(2), last: dec!(1.5) });
        connector.fail_next(ConnectorError::transient("reset"));
        connector.fail_next(ConnectorError::RateLimited { retry_after: Some(Duration::from_secs(1)) });

        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());
        let ticker = facade.ticker().await.unwrap();

        assert_eq!(ticker.last, dec!(1.5));
        assert_eq!(connector.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_properties_fail_fast_after_exhaustion() {
        let connector = connector();
        for _ in 0..4 {
            connector.fail_next(ConnectorError::transient("down"));
        }

        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());
        let result = facade.exchange_properties().await;

        assert!(matches!(result, Err(ExecError::RetriesExhausted { attempts: 4, .. })));
    }

    #[tokio::test]
    async fn test_acknowledged_is_distinct_from_failure() {
        let connector = connector();
        connector.fail_next(ConnectorError::Acknowledged("already cancelled".to_string()));

        let facade = ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy());
        let err = facade.open_positions().await.unwrap_err();

        assert!(err.is_acknowledged());
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_facade_stops_reads() {
        let token = CancellationToken::new();
        token.cancel();

        let connector = connector();
        let facade =
            ExchangeFacade::new(connector.clone(), btc_usdt(), quick_policy()).with_cancellation(token);

        assert!(matches!(facade.ticker().await, Err(ExecError::Cancelled)));
        assert_eq!(connector.calls(), 0);
    }

    #[tokio::test]
    async fn test_sign_requires_signer() {
        let facade = ExchangeFacade::new(connector(), btc_usdt(), quick_policy());
        assert!(matches!(facade.sign("tx").await, Err(ExecError::Config(_))));

        let facade = facade.with_signer(Arc::new(StubSigner::new("k1")));
        assert_eq!(facade.sign("tx").await.unwrap().key, "k1");
    }
}
