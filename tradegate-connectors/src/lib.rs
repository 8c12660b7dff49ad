//! Tradegate Exchange Connectors
//!
//! Adapters for exchange APIs and signing services.
//! Normalizes exchange-specific types to domain types.

#![warn(clippy::all)]

// Public modules
pub mod binance;
pub mod key_vault;
pub mod signer;

// Re-exports
pub use binance::{BinanceConnector, SymbolFilters, SymbolRules};
pub use key_vault::{KeyVaultConfig, KeyVaultSigner};
pub use signer::HmacSigner;
