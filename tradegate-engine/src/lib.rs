//! Tradegate Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//!
//! # Components
//!
//! - **Market resolution**: find the active pair inside an exchange snapshot
//! - **Precision**: truncate rates and amounts to the market's decimals
//! - **Validation**: decide whether an order is admissible on a market
//!
//! # Flow
//!
//! ```text
//! ExchangeProperties → resolve_market → truncate → validate_order → verdict
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod market;
pub mod precision;
pub mod validation;

// Re-exports for convenience
pub use error::{EngineError, EngineResult};
pub use market::resolve_market;
pub use precision::{has_at_most_decimals, truncate};
pub use validation::{
    validate_order, Capabilities, LotCheck, OrderCheck, PriceCheck, RejectReason,
    ValidationResult,
};
