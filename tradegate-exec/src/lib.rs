//! Tradegate Execution Layer
//!
//! Runs market-data and order operations against a pluggable exchange
//! connector, with bounded retries for transient failures and order
//! admissibility checks before anything reaches the exchange.
//!
//! # Architecture
//!
//! ```text
//! Agent → ExchangeFacade → resolve market → truncate → validate → ConnectorPort
//!                 │                                                  ↑
//!                 └──────────── RetryExecutor (reads) ───────────────┘
//! ```
//!
//! # Components
//!
//! - **Retry**: bounded exponential backoff over an async operation
//! - **Ports**: traits for the exchange connector and the signing service
//! - **Facade**: composes the engine and the retry loop around a connector
//! - **Stub**: paper connector and signer for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use tradegate_exec::{ExchangeFacade, RetryPolicy, StubConnector};
//! use std::sync::Arc;
//!
//! let connector = Arc::new(StubConnector::new(properties));
//! let facade = ExchangeFacade::new(connector, market, RetryPolicy::default());
//!
//! let order_id = facade.put_position(OrderType::Buy, rate, amount_a, amount_b).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod facade;
pub mod ports;
pub mod retry;
pub mod stub;

// Re-exports for convenience
pub use error::{ExecError, ExecResult};
pub use facade::ExchangeFacade;
pub use ports::{classify, ConnectorError, ConnectorPort, SignError, SigningPort};
pub use retry::{Completion, Outcome, RetryError, RetryExecutor, RetryPolicy};
pub use stub::{MinNotional, StubConnector, StubSigner, TickSize};
