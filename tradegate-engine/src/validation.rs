//! Order admissibility.
//!
//! An order is checked against the market's minimum size and, when the
//! connector provides them, exchange-specific price and lot rules.
//!
//! # Capabilities
//!
//! Price and lot rules are optional. A connector that cannot judge prices
//! simply does not hand a `PriceCheck` to the validator, and the check is
//! skipped. An absent capability never makes an order invalid.
//!
//! # Rule order
//!
//! 1. amount below the market minimum → `AmountTooSmall`
//! 2. price rejected by `PriceCheck` → `InvalidPrice`
//! 3. lot rejected by `LotCheck` → `LotTooSmall`
//!
//! The first violated rule is reported.

use std::fmt;

use rust_decimal::Decimal;
use tradegate_domain::Market;
use tracing::debug;

// =============================================================================
// Capabilities
// =============================================================================

/// Exchange-specific price rule (tick size, price bands, ...).
pub trait PriceCheck: Send + Sync {
    /// Whether the exchange would accept `price` on the active market.
    fn is_valid_price(&self, price: Decimal) -> bool;
}

/// Exchange-specific lot rule (minimum notional, lot size, ...).
pub trait LotCheck: Send + Sync {
    /// Whether the exchange would accept `amount` at `price` on the active market.
    fn is_valid_lot(&self, price: Decimal, amount: Decimal) -> bool;
}

/// The optional rules a connector exposes to the validator.
#[derive(Clone, Copy, Default)]
pub struct Capabilities<'a> {
    price: Option<&'a dyn PriceCheck>,
    lot: Option<&'a dyn LotCheck>,
}

impl<'a> Capabilities<'a> {
    /// No optional rules.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from whatever the connector provides.
    pub fn new(price: Option<&'a dyn PriceCheck>, lot: Option<&'a dyn LotCheck>) -> Self {
        Self { price, lot }
    }

    /// Add a price rule.
    pub fn with_price(mut self, check: &'a dyn PriceCheck) -> Self {
        self.price = Some(check);
        self
    }

    /// Add a lot rule.
    pub fn with_lot(mut self, check: &'a dyn LotCheck) -> Self {
        self.lot = Some(check);
        self
    }

    pub fn supports_price_check(&self) -> bool {
        self.price.is_some()
    }

    pub fn supports_lot_check(&self) -> bool {
        self.lot.is_some()
    }
}

impl fmt::Debug for Capabilities<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("price", &self.supports_price_check())
            .field("lot", &self.supports_lot_check())
            .finish()
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// The figures of a prospective order that admissibility depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCheck {
    /// Order size, in the market's second asset
    pub amount: Decimal,
    /// Limit rate
    pub price: Decimal,
}

/// Why an order was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Below the market's minimal order amount
    AmountTooSmall,
    /// Rejected by the connector's price rule
    InvalidPrice,
    /// Rejected by the connector's lot rule
    LotTooSmall,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::AmountTooSmall => write!(f, "Amount is too small"),
            RejectReason::InvalidPrice => write!(f, "Price is not valid"),
            RejectReason::LotTooSmall => write!(f, "Lot size is too small"),
        }
    }
}

/// Outcome of an admissibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    reason: Option<RejectReason>,
}

impl ValidationResult {
    /// An admissible order.
    pub fn valid() -> Self {
        Self { reason: None }
    }

    /// A rejected order.
    pub fn invalid(reason: RejectReason) -> Self {
        Self { reason: Some(reason) }
    }

    pub fn is_valid(&self) -> bool {
        self.reason.is_none()
    }

    /// The violated rule, `None` when valid.
    pub fn reason(&self) -> Option<RejectReason> {
        self.reason
    }

    /// Human-readable reason, empty when valid.
    pub fn reason_text(&self) -> String {
        self.reason.map(|r| r.to_string()).unwrap_or_default()
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Decide whether `order` is admissible on `market`.
///
/// # Examples
///
/// ```
/// # use tradegate_domain::Market;
/// # use tradegate_engine::{validate_order, Capabilities, OrderCheck, RejectReason};
/// # use rust_decimal_macros::dec;
/// let market = Market::new("BTC", "USDT", dec!(0.001), 2);
/// let order = OrderCheck { amount: dec!(0.0005), price: dec!(100.45) };
///
/// let result = validate_order(&order, &market, Capabilities::none());
/// assert_eq!(result.reason(), Some(RejectReason::AmountTooSmall));
/// ```
pub fn validate_order(
    order: &OrderCheck,
    market: &Market,
    capabilities: Capabilities<'_>,
) -> ValidationResult {
    let result = check(order, market, capabilities);

    if let Some(reason) = result.reason() {
        debug!(
            amount = %order.amount,
            price = %order.price,
            minimum = %market.minimal_order.amount,
            %reason,
            "Order rejected"
        );
    }

    result
}

fn check(order: &OrderCheck, market: &Market, capabilities: Capabilities<'_>) -> ValidationResult {
    if order.amount < market.minimal_order.amount {
        return ValidationResult::invalid(RejectReason::AmountTooSmall);
    }

    if let Some(rule) = capabilities.price {
        if !rule.is_valid_price(order.price) {
            return ValidationResult::invalid(RejectReason::InvalidPrice);
        }
    }

    if let Some(rule) = capabilities.lot {
        if !rule.is_valid_lot(order.price, order.amount) {
            return ValidationResult::invalid(RejectReason::LotTooSmall);
        }
    }

    ValidationResult::valid()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPrice(bool);

    impl PriceCheck for FixedPrice {
        fn is_valid_price(&self, _price: Decimal) -> bool {
            self.0
        }
    }

    struct MinNotional(Decimal);

    impl LotCheck for MinNotional {
        fn is_valid_lot(&self, price: Decimal, amount: Decimal) -> bool {
            price * amount >= self.0
        }
    }

    struct CountingPrice(AtomicUsize);

    impl PriceCheck for CountingPrice {
        fn is_valid_price(&self, _price: Decimal) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn market() -> Market {
        Market::new("BTC", "USDT", dec!(0.001), 2)
    }

    #[test]
    fn test_valid_without_capabilities() {
        let order = OrderCheck { amount: dec!(0.5), price: dec!(95000) };
        let result = validate_order(&order, &market(), Capabilities::none());
        assert!(result.is_valid());
        assert_eq!(result.reason_text(), "");
    }

    #[test]
    fn test_amount_at_minimum_is_valid() {
        let order = OrderCheck { amount: dec!(0.001), price: dec!(95000) };
        assert!(validate_order(&order, &market(), Capabilities::none()).is_valid());
    }

    #[test]
    fn test_amount_too_small() {
        let order = OrderCheck { amount: dec!(0.0009), price: dec!(95000) };
        let result = validate_order(&order, &market(), Capabilities::none());
        assert!(!result.is_valid());
        assert_eq!(result.reason_text(), "Amount is too small");
    }

    #[test]
    fn test_invalid_price() {
        let price = FixedPrice(false);
        let order = OrderCheck { amount: dec!(1), price: dec!(95000) };
        let result = validate_order(&order, &market(), Capabilities::none().with_price(&price));
        assert_eq!(result.reason(), Some(RejectReason::InvalidPrice));
        assert_eq!(result.reason_text(), "Price is not valid");
    }

    #[test]
    fn test_lot_too_small() {
        let lot = MinNotional(dec!(10));
        let order = OrderCheck { amount: dec!(0.001), price: dec!(5000) };
        let result = validate_order(&order, &market(), Capabilities::none().with_lot(&lot));
        assert_eq!(result.reason(), Some(RejectReason::LotTooSmall));
        assert_eq!(result.reason_text(), "Lot size is too small");
    }

    #[test]
    fn test_amount_check_wins_over_price() {
        let price = FixedPrice(false);
        let lot = MinNotional(dec!(1000000));
        let order = OrderCheck { amount: dec!(0.0001), price: dec!(1) };
        let capabilities = Capabilities::new(Some(&price), Some(&lot));

        let result = validate_order(&order, &market(), capabilities);
        assert_eq!(result.reason(), Some(RejectReason::AmountTooSmall));
    }

    #[test]
    fn test_price_check_wins_over_lot() {
        let price = FixedPrice(false);
        let lot = MinNotional(dec!(1000000));
        let order = OrderCheck { amount: dec!(1), price: dec!(1) };
        let capabilities = Capabilities::new(Some(&price), Some(&lot));

        let result = validate_order(&order, &market(), capabilities);
        assert_eq!(result.reason(), Some(RejectReason::InvalidPrice));
    }

    #[test]
    fn test_missing_capabilities_never_fail() {
        // Prices and lots that any rule would reject pass when no rule is present.
        for (amount, price) in [(dec!(1), dec!(0)), (dec!(0.001), dec!(-5)), (dec!(100), dec!(0.0000001))] {
            let order = OrderCheck { amount, price };
            assert!(validate_order(&order, &market(), Capabilities::none()).is_valid());
        }
    }

    #[test]
    fn test_price_rule_not_consulted_for_small_amount() {
        let price = CountingPrice(AtomicUsize::new(0));
        let order = OrderCheck { amount: dec!(0.0001), price: dec!(95000) };
        let _ = validate_order(&order, &market(), Capabilities::none().with_price(&price));
        assert_eq!(price.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_capabilities_flags() {
        let price = FixedPrice(true);
        let capabilities = Capabilities::none().with_price(&price);
        assert!(capabilities.supports_price_check());
        assert!(!capabilities.supports_lot_check());
        assert_eq!(format!("{:?}", capabilities), "Capabilities { price: true, lot: false }");
    }
}
