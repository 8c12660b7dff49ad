//! Engine error types.

use thiserror::Error;

/// Errors raised by the pure decision layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The exchange snapshot has no market for the requested pair.
    ///
    /// This is a configuration problem: retrying cannot fix it.
    #[error("No market configured for {asset_a}/{asset_b}")]
    MarketNotFound { asset_a: String, asset_b: String },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
