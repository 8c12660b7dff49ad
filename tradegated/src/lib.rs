//! Tradegate Daemon Library
//!
//! Runtime orchestrator for the Tradegate exchange facade.
//!
//! # Architecture
//!
//! ```text
//! Config → Daemon → ExchangeFacade → ConnectorPort (Binance | Paper)
//!                        │
//!                   SigningPort (HMAC | Key Vault)
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use tradegated::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::from_config(config).expect("Failed to build daemon");
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use config::{BinanceConfig, Config, ConnectorKind, Environment, ExchangeConfig, RetryConfig};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
