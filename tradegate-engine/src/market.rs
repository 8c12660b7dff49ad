//! Market resolution.
//!
//! Finds the configuration record for the active trading pair inside a
//! snapshot of exchange properties.

use tradegate_domain::{ExchangeProperties, Market};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Resolve the market whose pair is exactly `(asset_a, asset_b)`.
///
/// Both symbols are compared case-insensitively; the pair order is not
/// relaxed, so a swapped pair does not match. When several markets match,
/// the first one in snapshot order wins.
///
/// Case folding is ASCII-only. Exchange tickers are ASCII, so non-ASCII
/// letters (e.g. `ß`, `É`) must match exactly.
///
/// # Errors
///
/// Returns `EngineError::MarketNotFound` if no market matches.
///
/// # Examples
///
/// ```
/// # use tradegate_domain::{ExchangeProperties, Market};
/// # use tradegate_engine::resolve_market;
/// # use rust_decimal_macros::dec;
/// let properties = ExchangeProperties::new(vec![Market::new("BTC", "USDT", dec!(0.001), 2)]);
///
/// assert!(resolve_market(&properties, "btc", "usdt").is_ok());
/// assert!(resolve_market(&properties, "USDT", "BTC").is_err());
/// ```
pub fn resolve_market<'a>(
    properties: &'a ExchangeProperties,
    asset_a: &str,
    asset_b: &str,
) -> EngineResult<&'a Market> {
    let found = properties.markets.iter().find(|market| {
        market.asset_a().eq_ignore_ascii_case(asset_a)
            && market.asset_b().eq_ignore_ascii_case(asset_b)
    });

    match found {
        Some(market) => {
            debug!(asset_a, asset_b, max_decimals = market.max_decimals, "Resolved market");
            Ok(market)
        },
        None => Err(EngineError::MarketNotFound {
            asset_a: asset_a.to_string(),
            asset_b: asset_b.to_string(),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================
