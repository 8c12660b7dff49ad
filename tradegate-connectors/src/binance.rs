//! Binance Spot REST connector.
//!
//! Provides:
//! - Market snapshot from `exchangeInfo`, with the active symbol's filters
//!   backing the price and lot capability checks
//! - Ticker, open orders, own trades and the public aggregate-trade tape
//! - Limit orders (GTC) and atomic cancel-replace for moving them
//!
//! # Authentication
//!
//! Signed requests carry the query string signature produced by a
//! [`SigningPort`]:
//! - `X-MBX-APIKEY` header (the key reported by the signer)
//! - `signature` query parameter
//! - `timestamp` query parameter
//!
//! # Error mapping
//!
//! | Response                     | ConnectorError |
//! |------------------------------|----------------|
//! | HTTP 429 / 418               | `RateLimited` (with `Retry-After`) |
//! | HTTP 5xx, timeout, transport | `Transient`    |
//! | other API error codes        | `Rejected`     |
//! | undecodable body             | `Parse`        |

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use tradegate_domain::{
    ExchangeProperties, Market, MarketContext, OrderId, OrderType, Position, PublicTrade, Ticker,
    Trade,
};
use tradegate_engine::{LotCheck, PriceCheck};
use tradegate_exec::{ConnectorError, ConnectorPort, SigningPort};

// =============================================================================
// Constants
// =============================================================================

/// Binance REST API base URL (Spot)
const BINANCE_API_URL: &str = "https://api.binance.com";

/// Binance Spot testnet base URL
const BINANCE_TESTNET_URL: &str = "https://testnet.binance.vision";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Precision used when a symbol publishes no tick or step size
const DEFAULT_DECIMALS: u32 = 8;

/// Widest window `aggTrades` accepts when both bounds are given
const AGG_TRADES_WINDOW_SECS: i64 = 3600;

/// Maximum rows per `aggTrades` request
const AGG_TRADES_LIMIT: u32 = 1000;

/// Timestamp outside of the receive window
const ERR_TIMESTAMP: i64 = -1021;

/// Too many requests
const ERR_TOO_MANY_REQUESTS: i64 = -1003;

// =============================================================================
// Symbol filters
// =============================================================================

/// Trading rules Binance publishes for one symbol.
///
/// A zero field means the exchange imposes no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolFilters {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub tick_size: Decimal,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    pub step_size: Decimal,
    pub min_notional: Decimal,
}

impl SymbolFilters {
    fn from_raw(filters: &[RawFilter]) -> Self {
        let mut out = Self::default();

        for filter in filters {
            match filter {
                RawFilter::Price { min_price, max_price, tick_size } => {
                    out.min_price = *min_price;
                    out.max_price = *max_price;
                    out.tick_size = *tick_size;
                },
                RawFilter::LotSize { min_qty, max_qty, step_size } => {
                    out.min_qty = *min_qty;
                    out.max_qty = *max_qty;
                    out.step_size = *step_size;
                },
                RawFilter::Notional { min_notional } | RawFilter::MinNotional { min_notional } => {
                    out.min_notional = *min_notional;
                },
                RawFilter::Other => {},
            }
        }

        out
    }

    /// Fractional digits valid for both prices and quantities.
    pub fn max_decimals(&self) -> u32 {
        [self.tick_size, self.step_size]
            .iter()
            .filter(|step| !step.is_zero())
            .map(|step| step.normalize().scale())
            .min()
            .unwrap_or(DEFAULT_DECIMALS)
    }

    /// Price range and tick alignment.
    pub fn accepts_price(&self, price: Decimal) -> bool {
        if price <= Decimal::ZERO {
            return false;
        }
        if !self.min_price.is_zero() && price < self.min_price {
            return false;
        }
        if !self.max_price.is_zero() && price > self.max_price {
            return false;
        }
        self.tick_size.is_zero() || ((price - self.min_price) % self.tick_size).is_zero()
    }

    /// Quantity bound, step alignment and minimum notional.
    pub fn accepts_lot(&self, price: Decimal, quantity: Decimal) -> bool {
        if !self.max_qty.is_zero() && quantity > self.max_qty {
            return false;
        }
        if !self.step_size.is_zero() && !((quantity - self.min_qty) % self.step_size).is_zero() {
            return false;
        }
        self.min_notional.is_zero() || price * quantity >= self.min_notional
    }
}

/// Filters of the active symbol, refreshed with every market snapshot.
///
/// Until the first snapshot is loaded every price and lot is accepted.
#[derive(Debug, Default)]
pub struct SymbolRules {
    filters: RwLock<Option<SymbolFilters>>,
}

impl SymbolRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached filters.
    pub fn load(&self, filters: Option<SymbolFilters>) {
        *self.filters.write().unwrap_or_else(PoisonError::into_inner) = filters;
    }

    /// Currently cached filters.
    pub fn current(&self) -> Option<SymbolFilters> {
        *self.filters.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PriceCheck for SymbolRules {
    fn is_valid_price(&self, price: Decimal) -> bool {
        self.current().map_or(true, |filters| filters.accepts_price(price))
    }
}

impl LotCheck for SymbolRules {
    fn is_valid_lot(&self, price: Decimal, amount: Decimal) -> bool {
        self.current().map_or(true, |filters| filters.accepts_lot(price, amount))
    }
}

// =============================================================================
// Binance Connector
// =============================================================================

/// Binance Spot connector bound to one trading pair.
pub struct BinanceConnector {
    /// HTTP client
    client: Client,
    /// API base URL
    base_url: String,
    /// Signs query strings of private endpoints
    signer: Arc<dyn SigningPort>,
    /// Active trading pair
    market: MarketContext,
    /// Exchange symbol of the active pair (e.g., "BTCUSDT")
    symbol: String,
    /// Filters of the active symbol
    rules: SymbolRules,
}

impl BinanceConnector {
    /// Create a connector for production.
    pub fn new(signer: Arc<dyn SigningPort>, market: MarketContext) -> Self {
        Self::with_base_url(signer, market, BINANCE_API_URL)
    }

    /// Create a connector for the Spot testnet.
    pub fn testnet(signer: Arc<dyn SigningPort>, market: MarketContext) -> Self {
        Self::with_base_url(signer, market, BINANCE_TESTNET_URL)
    }

    /// Create a connector against an arbitrary base URL.
    pub fn with_base_url(
        signer: Arc<dyn SigningPort>,
        market: MarketContext,
        base_url: impl Into<String>,
    ) -> Self {
        let symbol = symbol_for(market.asset_a(), market.asset_b());
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            signer,
            market,
            symbol,
            rules: SymbolRules::new(),
        }
    }

    pub fn market(&self) -> &MarketContext {
        &self.market
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn rules(&self) -> &SymbolRules {
        &self.rules
    }

    /// Build the signed query string and return it with the API key to send.
    ///
    /// Binance requires:
    /// 1. All parameters in query string
    /// 2. Signature of the query string
    /// 3. signature and timestamp as query parameters
    async fn build_signed_query(
        &self,
        mut params: Vec<(&str, String)>,
    ) -> Result<(String, String), ConnectorError> {
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        params.sort_by(|a, b| a.0.cmp(b.0));

        let query_string = encode_query(&params);
        let signature = self.signer.sign(&query_string).await?;

        Ok((signature.key, format!("{}&signature={}", query_string, signature.signature)))
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, ConnectorError> {
        let response = timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), request.send())
            .await
            .map_err(|_| ConnectorError::transient("Request timed out"))?
            .map_err(|e| ConnectorError::transient(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::transient(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            let error = map_error_response(status, retry_after, &body);
            warn!(%status, error = %error, "Binance request failed");
            return Err(error);
        }

        Ok(body)
    }

    /// Send a GET request to a public endpoint.
    async fn get_public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ConnectorError> {
        let url = if params.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, encode_query(&params))
        };

        debug!(%url, "GET public");
        let body = self.send(self.client.get(&url)).await?;
        parse(&body)
    }

    /// Send a GET request to a signed endpoint.
    async fn get_signed<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ConnectorError> {
        let (api_key, query) = self.build_signed_query(params).await?;
        let url = format!("{}{}?{}", self.base_url, endpoint, query);

        debug!(endpoint, "GET signed");
        let body = self.send(self.client.get(&url).header("X-MBX-APIKEY", api_key)).await?;
        parse(&body)
    }

    /// Send a POST request to a signed endpoint.
    async fn post_signed<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ConnectorError> {
        let (api_key, query) = self.build_signed_query(params).await?;
        let url = format!("{}{}?{}", self.base_url, endpoint, query);

        debug!(endpoint, "POST signed");
        let body = self.send(self.client.post(&url).header("X-MBX-APIKEY", api_key)).await?;
        parse(&body)
    }

    /// Place a GTC limit order.
    async fn place_limit_order(
        &self,
        asset_a: &str,
        asset_b: &str,
        side: OrderType,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        let params = vec![
            ("symbol", symbol_for(asset_a, asset_b)),
            ("side", side_param(side).to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("price", rate.normalize().to_string()),
            ("quantity", amount.normalize().to_string()),
            ("newClientOrderId", client_order_id()),
        ];

        let response: OrderResponse = self.post_signed("/api/v3/order", params).await?;
        Ok(response.order_id.to_string())
    }
}

#[async_trait]
impl ConnectorPort for BinanceConnector {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn exchange_properties(&self) -> Result<ExchangeProperties, ConnectorError> {
        let info: ExchangeInfoResponse = self.get_public("/api/v3/exchangeInfo", vec![]).await?;
        let (properties, filters) = build_properties(info, &self.symbol);

        if filters.is_none() {
            warn!(symbol = %self.symbol, "Active symbol not listed by exchange");
        }
        self.rules.load(filters);

        debug!(markets = properties.markets.len(), "Exchange properties loaded");
        Ok(properties)
    }

    async fn ticker(&self, market: &MarketContext) -> Result<Ticker, ConnectorError> {
        let symbol = symbol_for(market.asset_a(), market.asset_b());

        let book: BookTickerResponse = self
            .get_public("/api/v3/ticker/bookTicker", vec![("symbol", symbol.clone())])
            .await?;
        let last: PriceResponse =
            self.get_public("/api/v3/ticker/price", vec![("symbol", symbol)]).await?;

        Ok(Ticker { bid: book.bid_price, ask: book.ask_price, last: last.price })
    }

    async fn open_positions(&self, market: &MarketContext) -> Result<Vec<Position>, ConnectorError> {
        let symbol = symbol_for(market.asset_a(), market.asset_b());
        let orders: Vec<OpenOrderResponse> =
            self.get_signed("/api/v3/openOrders", vec![("symbol", symbol)]).await?;

        orders.into_iter().map(OpenOrderResponse::into_position).collect()
    }

    async fn executed_trades(&self, position_id: &str) -> Result<Vec<Trade>, ConnectorError> {
        let params = vec![("symbol", self.symbol.clone()), ("orderId", position_id.to_string())];
        let trades: Vec<MyTradeResponse> = self.get_signed("/api/v3/myTrades", params).await?;

        trades.into_iter().map(MyTradeResponse::into_trade).collect()
    }

    async fn buy(
        &self,
        asset_a: &str,
        asset_b: &str,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        self.place_limit_order(asset_a, asset_b, OrderType::Buy, rate, amount).await
    }

    async fn sell(
        &self,
        asset_a: &str,
        asset_b: &str,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        self.place_limit_order(asset_a, asset_b, OrderType::Sell, rate, amount).await
    }

    async fn move_position(
        &self,
        position: &Position,
        new_rate: Decimal,
        new_amount: Decimal,
    ) -> Result<OrderId, ConnectorError> {
        let params = vec![
            ("symbol", self.symbol.clone()),
            ("side", side_param(position.order_type).to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("cancelReplaceMode", "STOP_ON_FAILURE".to_string()),
            ("cancelOrderId", position.id.clone()),
            ("price", new_rate.normalize().to_string()),
            ("quantity", new_amount.normalize().to_string()),
            ("newClientOrderId", client_order_id()),
        ];

        let response: CancelReplaceResponse =
            self.post_signed("/api/v3/order/cancelReplace", params).await?;

        response
            .new_order_response
            .map(|order| order.order_id.to_string())
            .ok_or_else(|| ConnectorError::Parse("cancelReplace returned no new order".to_string()))
    }

    async fn public_trade_history(
        &self,
        asset_a: &str,
        asset_b: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PublicTrade>, ConnectorError> {
        let symbol = symbol_for(asset_a, asset_b);
        let window = chrono::Duration::seconds(AGG_TRADES_WINDOW_SECS);

        let mut collector = AggTradeCollector::new(AGG_TRADES_LIMIT);
        let mut cursor = start;

        while cursor < end {
            let chunk_end = (cursor + window).min(end);

            let mut params = collector.window_query(&symbol, cursor, chunk_end);
            loop {
                let page: Vec<AggTradeResponse> = self.get_public("/api/v3/aggTrades", params).await?;
                if !collector.absorb(page, chunk_end)? {
                    break;
                }
                params = collector.continuation_query(&symbol);
                debug!(symbol = %symbol, from_id = ?collector.last_id, "Window is busy, fetching next page");
            }

            cursor = chunk_end;
        }

        Ok(collector.into_trades())
    }

    fn price_check(&self) -> Option<&dyn PriceCheck> {
        Some(&self.rules)
    }

    fn lot_check(&self) -> Option<&dyn LotCheck> {
        Some(&self.rules)
    }
}

// =============================================================================
// Public tape paging
// =============================================================================

/// Accumulates `aggTrades` rows across time windows and pages.
///
/// A window is first queried by time range. A full page means the window may
/// hold more rows, so follow-up pages continue by `fromId`, which Binance does
/// not accept together with `startTime`/`endTime`. Rows already seen (window
/// bounds are inclusive on both ends) are dropped.
struct AggTradeCollector {
    limit: u32,
    last_id: Option<u64>,
    trades: Vec<PublicTrade>,
}

impl AggTradeCollector {
    fn new(limit: u32) -> Self {
        Self { limit, last_id: None, trades: Vec::new() }
    }

    /// First query of a window.
    fn window_query(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", symbol.to_string()),
            ("startTime", start.timestamp_millis().to_string()),
            ("endTime", end.timestamp_millis().to_string()),
            ("limit", self.limit.to_string()),
        ]
    }

    /// Query for the page after the last row seen.
    fn continuation_query(&self, symbol: &str) -> Vec<(&'static str, String)> {
        let from_id = self.last_id.map_or(0, |id| id + 1);
        vec![
            ("symbol", symbol.to_string()),
            ("fromId", from_id.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }

    /// Take in one page of a window ending at `window_end`.
    ///
    /// Returns `true` when the window may still hold rows past this page.
    fn absorb(
        &mut self,
        page: Vec<AggTradeResponse>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, ConnectorError> {
        let full = page.len() >= self.limit as usize;
        let end_ms = window_end.timestamp_millis();
        let mut added = false;

        for row in page {
            // Continuation pages run past the window; the next window picks these up
            if row.time > end_ms {
                return Ok(false);
            }
            if self.last_id.is_some_and(|last| row.agg_id <= last) {
                continue;
            }
            self.last_id = Some(row.agg_id);
            self.trades.push(row.into_public_trade()?);
            added = true;
        }

        Ok(full && added)
    }

    fn into_trades(self) -> Vec<PublicTrade> {
        self.trades
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Exchange symbol for a pair.
fn symbol_for(asset_a: &str, asset_b: &str) -> String {
    format!("{}{}", asset_a, asset_b).to_ascii_uppercase()
}

/// Time-ordered client order ID.
fn client_order_id() -> String {
    Uuid::now_v7().simple().to_string()
}

fn side_param(side: OrderType) -> &'static str {
    match side {
        OrderType::Buy => "BUY",
        OrderType::Sell => "SELL",
    }
}

fn encode_query(params: &[(&str, String)]) -> String {
    params.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&")
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ConnectorError> {
    serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))
}

fn parse_side(side: &str) -> Result<OrderType, ConnectorError> {
    OrderType::from_str(side).map_err(|e| ConnectorError::Parse(e.to_string()))
}

fn parse_time(millis: i64) -> Result<DateTime<Utc>, ConnectorError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ConnectorError::Parse(format!("Invalid timestamp: {}", millis)))
}

/// Classify a non-success response.
fn map_error_response(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ConnectorError {
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
        return ConnectorError::RateLimited { retry_after };
    }

    if status.is_server_error() {
        return ConnectorError::Transient {
            message: format!("HTTP {}: {}", status, body),
            retry_after,
        };
    }

    match serde_json::from_str::<BinanceErrorResponse>(body) {
        Ok(err) if err.code == ERR_TOO_MANY_REQUESTS => ConnectorError::RateLimited { retry_after },
        Ok(err) if err.code == ERR_TIMESTAMP => {
            ConnectorError::transient(format!("{} - {}", err.code, err.msg))
        },
        Ok(err) => ConnectorError::Rejected(format!("{} - {}", err.code, err.msg)),
        Err(_) => ConnectorError::Rejected(format!("HTTP {}: {}", status, body)),
    }
}

/// Convert an `exchangeInfo` response into a market snapshot, picking out
/// the filters of `active_symbol` along the way.
fn build_properties(
    info: ExchangeInfoResponse,
    active_symbol: &str,
) -> (ExchangeProperties, Option<SymbolFilters>) {
    let mut active = None;

    let markets = info
        .symbols
        .into_iter()
        .filter(|symbol| symbol.status == "TRADING")
        .map(|symbol| {
            let filters = SymbolFilters::from_raw(&symbol.filters);
            if symbol.symbol.eq_ignore_ascii_case(active_symbol) {
                active = Some(filters);
            }
            Market::new(symbol.base_asset, symbol.quote_asset, filters.min_qty, filters.max_decimals())
        })
        .collect();

    (ExchangeProperties::new(markets), active)
}

// =============================================================================
// Binance Types (from API responses)
// =============================================================================

/// Binance error response.
#[derive(Debug, Deserialize)]
struct BinanceErrorResponse {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum RawFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price { min_price: Decimal, max_price: Decimal, tick_size: Decimal },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { min_qty: Decimal, max_qty: Decimal, step_size: Decimal },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: Decimal },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { min_notional: Decimal },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerResponse {
    bid_price: Decimal,
    ask_price: Decimal,
}

/// Price ticker response.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelReplaceResponse {
    new_order_response: Option<OrderResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderResponse {
    order_id: u64,
    price: Decimal,
    orig_qty: Decimal,
    executed_qty: Decimal,
    side: String,
    time: i64,
}

impl OpenOrderResponse {
    fn into_position(self) -> Result<Position, ConnectorError> {
        let remaining = self.orig_qty - self.executed_qty;
        Ok(Position {
            id: self.order_id.to_string(),
            order_type: parse_side(&self.side)?,
            rate: self.price,
            amount_a: self.price * remaining,
            amount_b: remaining,
            fee: Decimal::ZERO,
            datetime: parse_time(self.time)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyTradeResponse {
    id: u64,
    order_id: u64,
    price: Decimal,
    qty: Decimal,
    quote_qty: Decimal,
    commission: Decimal,
    time: i64,
    is_buyer: bool,
}

impl MyTradeResponse {
    fn into_trade(self) -> Result<Trade, ConnectorError> {
        Ok(Trade {
            id: self.id.to_string(),
            order_id: self.order_id.to_string(),
            order_type: if self.is_buyer { OrderType::Buy } else { OrderType::Sell },
            rate: self.price,
            amount_a: self.quote_qty,
            amount_b: self.qty,
            fee: self.commission,
            datetime: parse_time(self.time)?,
        })
    }
}

/// Aggregate trade from the public tape.
#[derive(Debug, Deserialize)]
struct AggTradeResponse {
    #[serde(rename = "a")]
    agg_id: u64,
    #[serde(rename = "p")]
    price: Decimal,
    #[serde(rename = "q")]
    quantity: Decimal,
    #[serde(rename = "f")]
    first_trade_id: u64,
    #[serde(rename = "T")]
    time: i64,
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

impl AggTradeResponse {
    fn into_public_trade(self) -> Result<PublicTrade, ConnectorError> {
        Ok(PublicTrade {
            trade_id: self.agg_id.to_string(),
            global_trade_id: self.first_trade_id.to_string(),
            // The taker side is the one that traded
            order_type: if self.buyer_is_maker { OrderType::Sell } else { OrderType::Buy },
            rate: self.price,
            amount_a: self.price * self.quantity,
            amount_b: self.quantity,
            date: parse_time(self.time)?,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
