//! Entities for the Tradegate Domain
//!
//! Read-only snapshots produced by exchange connectors on demand.
//! Nothing in the core mutates or persists them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value_objects::OrderType;

/// Exchange-assigned order identifier.
pub type OrderId = String;

// =============================================================================
// Markets
// =============================================================================

/// Smallest order the exchange accepts on a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalOrder {
    /// Minimum order quantity (`amount_b`)
    pub amount: Decimal,
}

/// A tradable asset pair plus its precision and minimum-order constraints.
///
/// The pair order is significant: `("BTC", "USDT")` and `("USDT", "BTC")`
/// are different markets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// (asset A, asset B)
    pub pair: (String, String),
    /// Minimum order constraints
    pub minimal_order: MinimalOrder,
    /// Maximum number of fractional digits for rates and amounts
    pub max_decimals: u32,
}

impl Market {
    /// Create a market definition.
    pub fn new(
        asset_a: impl Into<String>,
        asset_b: impl Into<String>,
        minimal_amount: Decimal,
        max_decimals: u32,
    ) -> Self {
        Self {
            pair: (asset_a.into(), asset_b.into()),
            minimal_order: MinimalOrder { amount: minimal_amount },
            max_decimals,
        }
    }

    /// First asset of the pair
    pub fn asset_a(&self) -> &str {
        &self.pair.0
    }

    /// Second asset of the pair
    pub fn asset_b(&self) -> &str {
        &self.pair.1
    }
}

/// Snapshot of an exchange's tradable markets.
///
/// Markets keep the order the connector reported them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeProperties {
    /// Ordered market definitions
    pub markets: Vec<Market>,
}

impl ExchangeProperties {
    /// Create properties from a list of markets.
    pub fn new(markets: Vec<Market>) -> Self {
        Self { markets }
    }
}

// =============================================================================
// Market Data
// =============================================================================

/// Best bid/ask and last traded price for a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// Last traded price
    pub last: Decimal,
}

/// A trade printed on the public tape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTrade {
    /// Exchange trade ID
    pub trade_id: String,
    /// Globally unique trade ID (falls back to the trade ID when the exchange has none)
    pub global_trade_id: String,
    /// Aggressor side
    pub order_type: OrderType,
    /// Execution rate
    pub rate: Decimal,
    /// Value at `rate` (rate × amount_b)
    pub amount_a: Decimal,
    /// Quantity
    pub amount_b: Decimal,
    /// Execution time
    pub date: DateTime<Utc>,
}

// =============================================================================
// Account State
// =============================================================================

/// An open order resting on the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Exchange order ID
    pub id: OrderId,
    /// Buy or sell
    pub order_type: OrderType,
    /// Limit rate
    pub rate: Decimal,
    /// Value at `rate` (rate × amount_b)
    pub amount_a: Decimal,
    /// Quantity
    pub amount_b: Decimal,
    /// Fee paid so far
    pub fee: Decimal,
    /// Creation time
    pub datetime: DateTime<Utc>,
}

/// An execution of one of our own orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Exchange trade ID
    pub id: String,
    /// Order this trade filled
    pub order_id: OrderId,
    /// Buy or sell
    pub order_type: OrderType,
    /// Execution rate
    pub rate: Decimal,
    /// Value at `rate` (rate × amount_b)
    pub amount_a: Decimal,
    /// Quantity
    pub amount_b: Decimal,
    /// Fee paid
    pub fee: Decimal,
    /// Execution time
    pub datetime: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
