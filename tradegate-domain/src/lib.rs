//! Tradegate Domain Layer
//!
//! Pure domain types with zero I/O dependencies.
//! Snapshots produced by exchange connectors (markets, tickers, positions,
//! trades) and the value objects that flow through the order path.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{
    ExchangeProperties, Market, MinimalOrder, OrderId, Position, PublicTrade, Ticker, Trade,
};
pub use value_objects::{DomainError, MarketContext, OrderType, Signature};
