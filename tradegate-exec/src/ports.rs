//! Execution layer port definitions.
//!
//! Ports define the interfaces for external services (exchange connector,
//! signing service). Adapters implement these ports for specific services
//! (Binance, key vault, stub, etc.).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use tradegate_domain::{
    ExchangeProperties, MarketContext, OrderId, Position, PublicTrade, Signature, Ticker, Trade,
};
use tradegate_engine::{LotCheck, PriceCheck};

use crate::retry::Outcome;

// =============================================================================
// Errors
// =============================================================================

/// Errors reported by exchange connectors.
///
/// The variant decides how the retry loop treats the failure, see [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// Network failure, timeout or server-side error
    #[error("Transient exchange failure: {message}")]
    Transient {
        /// What went wrong
        message: String,
        /// Wait suggested by the exchange, if any
        retry_after: Option<Duration>,
    },

    /// Request throttled by the exchange
    #[error("Rate limited by exchange")]
    RateLimited {
        /// Wait requested by the exchange, if any
        retry_after: Option<Duration>,
    },

    /// The exchange reports the request as already in effect
    #[error("Already in effect: {0}")]
    Acknowledged(String),

    /// Request refused by the exchange
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The connector does not offer this operation
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// Response could not be understood
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Request could not be signed
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl ConnectorError {
    /// Transient failure without a suggested wait.
    pub fn transient(message: impl Into<String>) -> Self {
        ConnectorError::Transient { message: message.into(), retry_after: None }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectorError::Transient { .. } | ConnectorError::RateLimited { .. })
    }
}

impl From<SignError> for ConnectorError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::Transport(message) => ConnectorError::transient(message),
            other => ConnectorError::Signing(other.to_string()),
        }
    }
}

/// Map a connector call result onto a retry outcome.
///
/// - `Transient` / `RateLimited` → `Retryable` (carrying any explicit wait)
/// - `Acknowledged` → `Settled`
/// - anything else → `Fail`
pub fn classify<T>(result: Result<T, ConnectorError>) -> Outcome<T, ConnectorError> {
    match result {
        Ok(value) => Outcome::Ok(value),
        Err(err) => match err {
            ConnectorError::Transient { retry_after, .. }
            | ConnectorError::RateLimited { retry_after } => {
                Outcome::Retryable { reason: err, retry_after }
            },
            ConnectorError::Acknowledged(_) => Outcome::Settled(err),
            _ => Outcome::Fail(err),
        },
    }
}

/// Errors reported by signing services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    /// The service could not be reached
    #[error("Signing service unreachable: {0}")]
    Transport(String),

    /// The service refused to sign
    #[error("Signing refused: {0}")]
    Refused(String),

    /// Local key material is unusable
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Service response could not be understood
    #[error("Malformed signing response: {0}")]
    Malformed(String),

    /// The signer already retried the transport and gave up
    #[error("Signing service unreachable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// The signer was cancelled before producing a signature
    #[error("Signing cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

// =============================================================================
// Connector Port
// =============================================================================

/// Port for exchange operations.
///
/// Implementations:
/// - `StubConnector` - Paper exchange (testing, development)
/// - `BinanceConnector` - Binance spot REST
///
/// Price and lot rules are optional capabilities. Connectors that enforce
/// them override [`price_check`](Self::price_check) /
/// [`lot_check`](Self::lot_check); the defaults report no capability.
#[async_trait]
pub trait ConnectorPort: Send + Sync {
    /// Short connector name for logs.
    fn name(&self) -> &'static str;

    /// Fresh snapshot of the exchange's markets.
    async fn exchange_properties(&self) -> Result<ExchangeProperties, ConnectorError>;

    /// Current ticker for a market.
    async fn ticker(&self, market: &MarketContext) -> Result<Ticker, ConnectorError>;

    /// Open orders of the account on a market.
    async fn open_positions(&self, market: &MarketContext) -> Result<Vec<Position>, ConnectorError>;

    /// Executions of one of our orders.
    async fn executed_trades(&self, position_id: &str) -> Result<Vec<Trade>, ConnectorError>;

    /// Place a buy limit order. Returns the exchange order ID.
    async fn buy(
        &self,
        asset_a: &str,
        asset_b: &str,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError>;

    /// Place a sell limit order. Returns the exchange order ID.
    async fn sell(
        &self,
        asset_a: &str,
        asset_b: &str,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<OrderId, ConnectorError>;

    /// Replace an open order with one at a new rate and amount.
    /// Returns the new exchange order ID.
    async fn move_position(
        &self,
        position: &Position,
        new_rate: Decimal,
        new_amount: Decimal,
    ) -> Result<OrderId, ConnectorError>;

    /// Public trades between `start` and `end`, ordered by trade ID.
    async fn public_trade_history(
        &self,
        asset_a: &str,
        asset_b: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PublicTrade>, ConnectorError>;

    /// Exchange price rule, if this connector has one.
    fn price_check(&self) -> Option<&dyn PriceCheck> {
        None
    }

    /// Exchange lot rule, if this connector has one.
    fn lot_check(&self) -> Option<&dyn LotCheck> {
        None
    }
}

// =============================================================================
// Signing Port
// =============================================================================

/// Port for the transaction-signing service.
///
/// Implementations:
/// - `StubSigner` - Deterministic fake signatures
/// - `HmacSigner` - Local HMAC-SHA256 with an API secret
/// - `KeyVaultSigner` - Remote key vault over GraphQL
#[async_trait]
pub trait SigningPort: Send + Sync {
    /// Sign `payload`.
    async fn sign(&self, payload: &str) -> Result<Signature, SignError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ok() {
        assert_eq!(classify::<u8>(Ok(7)), Outcome::Ok(7));
    }

    #[test]
    fn test_classify_transient_is_retryable() {
        let outcome = classify::<()>(Err(ConnectorError::transient("timeout")));
        assert!(matches!(outcome, Outcome::Retryable { retry_after: None, .. }));
    }

    #[test]
    fn test_classify_rate_limit_carries_delay() {
        let delay = Duration::from_secs(3);
        let outcome = classify::<()>(Err(ConnectorError::RateLimited { retry_after: Some(delay) }));
        assert!(matches!(outcome, Outcome::Retryable { retry_after: Some(d), .. } if d == delay));
    }

    #[test]
    fn test_classify_acknowledged_is_settled() {
        let outcome = classify::<()>(Err(ConnectorError::Acknowledged("done".to_string())));
        assert!(matches!(outcome, Outcome::Settled(_)));
    }

    #[test]
    fn test_classify_rejected_is_fatal() {
        for err in [
            ConnectorError::Rejected("bad".to_string()),
            ConnectorError::Unsupported("history".to_string()),
            ConnectorError::Parse("eof".to_string()),
            ConnectorError::Signing("no key".to_string()),
        ] {
            assert!(!err.is_retryable());
            assert!(matches!(classify::<()>(Err(err)), Outcome::Fail(_)));
        }
    }

    #[test]
    fn test_sign_error_conversion() {
        let transport: ConnectorError = SignError::Transport("connection reset".to_string()).into();
        assert!(transport.is_retryable());

        let refused: ConnectorError = SignError::Refused("unknown key".to_string()).into();
        assert!(matches!(refused, ConnectorError::Signing(_)));
    }

    #[test]
    fn test_signer_that_gave_up_is_not_retried_again() {
        let exhausted: ConnectorError =
            SignError::Exhausted { attempts: 4, last: "connection refused".to_string() }.into();
        assert!(!exhausted.is_retryable());
        assert!(matches!(classify::<()>(Err(exhausted)), Outcome::Fail(ConnectorError::Signing(_))));

        let cancelled: ConnectorError = SignError::Cancelled { attempts: 1 }.into();
        assert!(!cancelled.is_retryable());
    }
}
