//! Value Objects for the Tradegate Domain
//!
//! Immutable, validated domain primitives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Asset symbol must be non-empty
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Order type must be buy or sell
    #[error("Invalid order type: {0}")]
    InvalidOrderType(String),
}

// =============================================================================
// MarketContext
// =============================================================================

/// The trading pair an agent is currently operating on.
///
/// Passed explicitly to every component that needs to know the active
/// market. Symbols are stored as given; matching against exchange
/// properties is case-insensitive.
///
/// # Invariants
/// - Both assets are non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    asset_a: String,
    asset_b: String,
}

impl MarketContext {
    /// Create a market context from its two assets.
    ///
    /// # Examples
    /// ```
    /// # use tradegate_domain::MarketContext;
    /// let market = MarketContext::new("BTC", "USDT").unwrap();
    /// assert_eq!(market.asset_a(), "BTC");
    /// assert_eq!(market.asset_b(), "USDT");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAsset` if either asset is blank
    pub fn new(asset_a: impl Into<String>, asset_b: impl Into<String>) -> Result<Self, DomainError> {
        let asset_a = asset_a.into().trim().to_string();
        let asset_b = asset_b.into().trim().to_string();

        if asset_a.is_empty() || asset_b.is_empty() {
            return Err(DomainError::InvalidAsset("Both assets must be non-empty".to_string()));
        }

        Ok(Self { asset_a, asset_b })
    }

    /// First asset of the pair
    pub fn asset_a(&self) -> &str {
        &self.asset_a
    }

    /// Second asset of the pair
    pub fn asset_b(&self) -> &str {
        &self.asset_b
    }
}

impl fmt::Display for MarketContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset_a, self.asset_b)
    }
}

// =============================================================================
// OrderType
// =============================================================================

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Bid on the pair
    Buy,
    /// Offer on the pair
    Sell,
}

impl FromStr for OrderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderType::Buy),
            "sell" => Ok(OrderType::Sell),
            other => Err(DomainError::InvalidOrderType(format!(
                "{other}: must be either 'buy' or 'sell'"
            ))),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Buy => write!(f, "buy"),
            OrderType::Sell => write!(f, "sell"),
        }
    }
}

// =============================================================================
// Signature
// =============================================================================

/// Result of signing a payload: the public key identifying the signer and
/// the signature itself.
///
/// `Debug` hides `key`: it is the account's API key and authenticates every
/// request it is sent with. `signature` only covers one payload and is printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Key identifying the signer (API key for exchange requests)
    pub key: String,
    /// Signature over the payload
    pub signature: String,
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("key", &"[REDACTED]")
            .field("signature", &self.signature)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
