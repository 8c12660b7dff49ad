//! Stub implementations for testing.
//!
//! A paper exchange and a fake signer that behave like real adapters
//! without making any network calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tradegate_domain::{
    ExchangeProperties, Market, MarketContext, OrderId, OrderType, Position, PublicTrade,
    Signature, Ticker, Trade,
};
use tradegate_engine::{LotCheck, PriceCheck};

use crate::ports::{ConnectorError, ConnectorPort, SignError, SigningPort};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn pair_key(asset_a: &str, asset_b: &str) -> String {
    format!("{}/{}", asset_a.to_ascii_uppercase(), asset_b.to_ascii_uppercase())
}

// =============================================================================
// Capability rules
// =============================================================================

/// Price must be a positive multiple of the tick size.
#[derive(Debug, Clone, Copy)]
pub struct TickSize(pub Decimal);

impl PriceCheck for TickSize {
    fn is_valid_price(&self, price: Decimal) -> bool {
        price > Decimal::ZERO && (self.0.is_zero() || (price % self.0).is_zero())
    }
}

/// Notional value (price × amount) must reach a minimum.
#[derive(Debug, Clone, Copy)]
pub struct MinNotional(pub Decimal);

impl LotCheck for MinNotional {
    fn is_valid_lot(&self, price: Decimal, amount: Decimal) -> bool {
        price * amount >= self.0
    }
}

// =============================================================================
// Stub Connector
// =============================================================================

/// Paper exchange.
///
/// Orders rest in memory and never fill. Failures can be scripted with
/// [`fail_next`](Self::fail_next): each scripted error is returned by the
/// next call, in order. [`fail_next_order`](Self::fail_next_order) scripts
/// failures seen only by order submissions (`buy`, `sell`, `move_position`).
pub struct StubConnector {
    /// Markets reported by `exchange_properties`
    properties: RwLock<ExchangeProperties>,
    /// Tickers by pair
    tickers: RwLock<HashMap<String, Ticker>>,
    /// Resting orders
    open_positions: RwLock<Vec<Position>>,
    /// Own executions
    trades: RwLock<Vec<Trade>>,
    /// Public tape
    tape: RwLock<Vec<PublicTrade>>,
    /// Errors to return on upcoming calls
    scripted_failures: Mutex<VecDeque<ConnectorError>>,
    /// Errors to return on upcoming order submissions
    scripted_order_failures: Mutex<VecDeque<ConnectorError>>,
    /// Order counter for generating IDs
    order_counter: AtomicU64,
    /// Number of connector calls received
    calls: AtomicU32,
    /// Number of order submissions received
    order_calls: AtomicU32,
    /// Optional price rule
    tick_size: Option<TickSize>,
    /// Optional lot rule
    min_notional: Option<MinNotional>,
}

impl StubConnector {
    /// Create a paper exchange reporting `properties`.
    pub fn new(properties: ExchangeProperties) -> Self {
        Self {
            properties: RwLock::new(properties),
            tickers: RwLock::new(HashMap::new()),
            open_positions: RwLock::new(Vec::new()),
            trades: RwLock::new(Vec::new()),
            tape: RwLock::new(Vec::new()),
            scripted_failures: Mutex::new(VecDeque::new()),
            scripted_order_failures: Mutex::new(VecDeque::new()),
            order_counter: AtomicU64::new(0),
            calls: AtomicU32::new(0),
            order_calls: AtomicU32::new(0),
            tick_size: None,
            min_notional: None,
        }
    }

    /// Paper exchange with a couple of USDT markets and their tickers.
    pub fn paper() -> Self {
        let connector = Self::new(ExchangeProperties::new(vec![
            Market::new("BTC", "USDT", Decimal::new(1, 5), 2),
            Market::new("ETH", "USDT", Decimal::new(1, 4), 2),
        ]));

        connector.set_ticker(
            "BTC",
            "USDT",
            Ticker {
                bid: Decimal::new(9499950, 2),
                ask: Decimal::new(9500050, 2),
                last: Decimal::new(95000, 0),
            },
        );
        connector.set_ticker(
            "ETH",
            "USDT",
            Ticker {
                bid: Decimal::new(339995, 2),
                ask: Decimal::new(340005, 2),
                last: Decimal::new(3400, 0),
            },
        );

        connector
    }

    /// Enforce a tick size on prices.
    pub fn with_tick_size(mut self, tick: Decimal) -> Self {
        self.tick_size = Some(TickSize(tick));
        self
    }

    /// Enforce a minimum notional on orders.
    pub fn with_min_notional(mut self, minimum: Decimal) -> Self {
        self.min_notional = Some(MinNotional(minimum));
        self
    }

    /// Replace the reported markets.
    pub fn set_properties(&self, properties: ExchangeProperties) {
        *write(&self.properties) = properties;
    }

    /// Set the ticker for a pair.
    pub fn set_ticker(&self, asset_a: &str, asset_b: &str, ticker: Ticker) {
        write(&self.tickers).insert(pair_key(asset_a, asset_b), ticker);
    }

    /// Record an execution of one of our orders.
    pub fn record_trade(&self, trade: Trade) {
        write(&self.trades).push(trade);
    }

    /// Print a trade on the public tape.
    pub fn record_public_trade(&self, trade: PublicTrade) {
        write(&self.tape).push(trade);
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: ConnectorError) {
        self.scripted_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Make the next order submission fail with `error`.
    pub fn fail_next_order(&self, error: ConnectorError) {
        self.scripted_order_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of order submissions received so far.
    pub fn order_calls(&self) -> u32 {
        self.order_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of resting orders.
    pub fn positions(&self) -> Vec<Position> {
        read(&self.open_positions).clone()
    }

    /// Count the call and return the next scripted failure, if any.
    fn enter(&self) -> Result<(), ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self
            .scripted_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Like [`enter`](Self::enter), then consult the order failure queue.
    fn enter_order(&self) -> Result<(), ConnectorError> {
        self.enter()?;
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        match self
            .scripted_order_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_order_id(&self) -> OrderId {
        let n = self.order_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("PAPER-{}", n)
    }

    fn place(&self, order_type: OrderType, rate: Decimal, amount: Decimal) -> OrderId {
        let id = self.next_order_id();
        write(&self.open_positions).push(Position {
            id: id.clone(),
            order_type,
            rate,
            amount_a: rate * amount,
            amount_b: amount,
            fee: Decimal::ZERO,
            datetime: Utc::now(),
        });
        tracing::debug!(order_id = %id, %order_type, %rate, %amount, "Stub: order placed");
        id
    }
}

impl Default for StubConnector {
    fn default() -> Self {
        Self::paper()
    }
}

#[async_trait]
impl ConnectorPort for StubConnector {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn exchange_properties(&self) -> Result<ExchangeProperties, ConnectorError> {
        self.enter()?;
        Ok(read(&self.properties).clone())
    }

    async fn ticker(&self, market: &MarketContext) -> Result<Ticker, ConnectorError> {
        self.enter()?;
        read(&self.tickers)
            .get(&pair_key(market.asset_a(), market.asset_b()))
            .copied()
            .ok_or_else(|| ConnectorError::Rejected(format!("No ticker for {}", market)))
    }

    async fn open_positions(&self, _market: &MarketContext) -> Result<Vec<Position>, ConnectorError> {
        self.enter()?;
        Ok(read(&self.open_positions).clone())
    }

    async fn executed_trades(&self, position_id: &str) -> Result<Vec<Trade>, ConnectorError> {
        self.enter()?;
        Ok(read(&self.trades)
            .iter()
            .filter(|trade| trade.order_id == position_id)
            .cloned()
            .collect())
    }

    async fn buy(
        &self,
        _asset_a: &str,
        _asset_b: &str,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        self.enter_order()?;
        Ok(self.place(OrderType::Buy, rate, amount))
    }

    async fn sell(
        &self,
        _asset_a: &str,
        _asset_b: &str,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        self.enter_order()?;
        Ok(self.place(OrderType::Sell, rate, amount))
    }

    async fn move_position(
        &self,
        position: &Position,
        new_rate: Decimal,
        new_amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        self.enter_order()?;

        let order_type = {
            let mut positions = write(&self.open_positions);
            let index = positions
                .iter()
                .position(|p| p.id == position.id)
                .ok_or_else(|| ConnectorError::Rejected(format!("Unknown order {}", position.id)))?;
            positions.remove(index).order_type
        };

        Ok(self.place(order_type, new_rate, new_amount))
    }

    async fn public_trade_history(
        &self,
        _asset_a: &str,
        _asset_b: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PublicTrade>, ConnectorError> {
        self.enter()?;
        Ok(read(&self.tape)
            .iter()
            .filter(|trade| trade.date >= start && trade.date <= end)
            .cloned()
            .collect())
    }

    fn price_check(&self) -> Option<&dyn PriceCheck> {
        self.tick_size.as_ref().map(|rule| rule as &dyn PriceCheck)
    }

    fn lot_check(&self) -> Option<&dyn LotCheck> {
        self.min_notional.as_ref().map(|rule| rule as &dyn LotCheck)
    }
}

// =============================================================================
// Stub Signer
// =============================================================================

/// Signer producing deterministic fake signatures.
pub struct StubSigner {
    key: String,
    fail_next: Mutex<Option<SignError>>,
}

impl StubSigner {
    /// Create a signer that reports `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), fail_next: Mutex::new(None) }
    }

    /// Make the next signature request fail.
    pub fn set_fail_next(&self, error: SignError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }
}

#[async_trait]
impl SigningPort for StubSigner {
    async fn sign(&self, payload: &str) -> Result<Signature, SignError> {
        if let Some(error) = self.fail_next.lock().unwrap_or_else(PoisonError::into_inner).take() {
            return Err(error);
        }

        Ok(Signature {
            key: self.key.clone(),
            signature: format!("stub-{}-{}", self.key, payload.len()),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
