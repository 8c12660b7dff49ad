//! Decimal precision.
//!
//! Rates and amounts are cut down to the number of fractional digits a
//! market accepts. Excess digits are discarded, never rounded: rounding up
//! could produce an order larger than the balance that backs it.

use rust_decimal::{Decimal, RoundingStrategy};

/// Truncate `value` to at most `decimals` fractional digits.
///
/// Works on the scaled integer representation of the decimal, so no binary
/// floating-point error is introduced. Trailing zeros are dropped from the
/// result. Negative values truncate toward zero.
///
/// # Examples
///
/// ```
/// # use tradegate_engine::truncate;
/// # use rust_decimal_macros::dec;
/// assert_eq!(truncate(dec!(100.456), 2), dec!(100.45));
/// assert_eq!(truncate(dec!(0.99999), 0), dec!(0));
/// ```
pub fn truncate(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero).normalize()
}

/// Whether `value` carries no more than `decimals` significant fractional digits.
pub fn has_at_most_decimals(value: Decimal, decimals: u32) -> bool {
    value.normalize().scale() <= decimals
}

// =============================================================================
// Tests
// =============================================================================
