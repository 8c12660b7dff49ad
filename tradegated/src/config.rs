//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tradegate_connectors::KeyVaultConfig;
use tradegate_exec::RetryPolicy;

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Exchange and active market
    pub exchange: ExchangeConfig,

    /// Retry policy for exchange reads and remote signing
    pub retry: RetryConfig,

    /// Binance credentials
    pub binance: BinanceConfig,

    /// Remote signing service, when configured
    pub key_vault: Option<KeyVaultConfig>,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Exchange configuration.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Which connector to run
    pub kind: ConnectorKind,
    /// First asset of the active pair
    pub asset_a: String,
    /// Second asset of the active pair
    pub asset_b: String,
    /// Interval between ticker polls
    pub poll_interval: Duration,
}

/// Retry configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff growth factor
    pub factor: f64,
    /// Delay before the first retry
    pub min_delay: Duration,
    /// Upper bound on any delay
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Build the policy, rejecting inconsistent bounds.
    pub fn policy(&self) -> DaemonResult<RetryPolicy> {
        RetryPolicy::new(self.max_retries, self.factor, self.min_delay, self.max_delay)
            .map_err(|e| DaemonError::Config(e.to_string()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries(),
            factor: policy.factor(),
            min_delay: policy.min_delay(),
            max_delay: policy.max_delay(),
        }
    }
}

/// Binance credentials.
#[derive(Clone, Default)]
pub struct BinanceConfig {
    /// API key
    pub api_key: Option<String>,
    /// API secret
    pub api_secret: Option<String>,
    /// Use the Spot testnet
    pub testnet: bool,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("testnet", &self.testnet)
            .finish()
    }
}

/// Connector selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    /// Binance Spot REST
    Binance,
    /// In-memory paper exchange
    Paper,
}

impl FromStr for ConnectorKind {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(ConnectorKind::Binance),
            "paper" => Ok(ConnectorKind::Paper),
            other => Err(DaemonError::Config(format!(
                "Invalid TRADEGATE_EXCHANGE: {}. Expected: binance, paper",
                other
            ))),
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorKind::Binance => write!(f, "binance"),
            ConnectorKind::Paper => write!(f, "paper"),
        }
    }
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> DaemonResult<Self> {
        let environment = Self::load_environment(&get)?;
        let exchange = Self::load_exchange_config(&get)?;
        let retry = Self::load_retry_config(&get)?;
        let binance = Self::load_binance_config(&get)?;
        let key_vault = Self::load_key_vault_config(&get);

        Ok(Self { exchange, retry, binance, key_vault, environment })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            exchange: ExchangeConfig {
                kind: ConnectorKind::Paper,
                asset_a: "BTC".to_string(),
                asset_b: "USDT".to_string(),
                poll_interval: Duration::from_secs(1),
            },
            retry: RetryConfig {
                max_retries: 2,
                factor: 1.5,
                min_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
            },
            binance: BinanceConfig::default(),
            key_vault: None,
            environment: Environment::Test,
        }
    }

    fn load_environment(get: &impl Fn(&str) -> Option<String>) -> DaemonResult<Environment> {
        let env_str = get("TRADEGATE_ENV").unwrap_or_else(|| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid TRADEGATE_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_exchange_config(get: &impl Fn(&str) -> Option<String>) -> DaemonResult<ExchangeConfig> {
        let kind = get("TRADEGATE_EXCHANGE")
            .map(|value| value.parse::<ConnectorKind>())
            .transpose()?
            .unwrap_or(ConnectorKind::Paper);

        let asset_a = get("TRADEGATE_ASSET_A").unwrap_or_else(|| "BTC".to_string());
        let asset_b = get("TRADEGATE_ASSET_B").unwrap_or_else(|| "USDT".to_string());
        let poll_secs: u64 = Self::load_parsed(get, "TRADEGATE_POLL_INTERVAL_SECS", 10)?;

        if poll_secs == 0 {
            return Err(DaemonError::Config(
                "TRADEGATE_POLL_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(ExchangeConfig {
            kind,
            asset_a,
            asset_b,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    fn load_retry_config(get: &impl Fn(&str) -> Option<String>) -> DaemonResult<RetryConfig> {
        let defaults = RetryConfig::default();

        let max_retries = Self::load_parsed(get, "TRADEGATE_RETRY_MAX", defaults.max_retries)?;
        let factor = Self::load_parsed(get, "TRADEGATE_RETRY_FACTOR", defaults.factor)?;
        let min_delay_ms = Self::load_parsed(
            get,
            "TRADEGATE_RETRY_MIN_DELAY_MS",
            defaults.min_delay.as_millis() as u64,
        )?;
        let max_delay_ms = Self::load_parsed(
            get,
            "TRADEGATE_RETRY_MAX_DELAY_MS",
            defaults.max_delay.as_millis() as u64,
        )?;

        let retry = RetryConfig {
            max_retries,
            factor,
            min_delay: Duration::from_millis(min_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        };

        // Surface bad bounds at load time
        retry.policy()?;
        Ok(retry)
    }

    fn load_binance_config(get: &impl Fn(&str) -> Option<String>) -> DaemonResult<BinanceConfig> {
        Ok(BinanceConfig {
            api_key: get("BINANCE_API_KEY").filter(|v| !v.is_empty()),
            api_secret: get("BINANCE_API_SECRET").filter(|v| !v.is_empty()),
            testnet: Self::load_parsed(get, "BINANCE_TESTNET", false)?,
        })
    }

    fn load_key_vault_config(get: &impl Fn(&str) -> Option<String>) -> Option<KeyVaultConfig> {
        let endpoint = get("KEY_VAULT_ENDPOINT").filter(|v| !v.is_empty())?;

        Some(KeyVaultConfig {
            endpoint,
            key_id: get("KEY_ID"),
            clone_id: get("CLONE_ID"),
            access_token: get("ACCESS_TOKEN"),
        })
    }

    fn load_parsed<T: FromStr>(
        get: &impl Fn(&str) -> Option<String>,
        key: &str,
        default: T,
    ) -> DaemonResult<T> {
        match get(key) {
            Some(val) => val
                .trim()
                .parse::<T>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            None => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig {
                kind: ConnectorKind::Paper,
                asset_a: "BTC".to_string(),
                asset_b: "USDT".to_string(),
                poll_interval: Duration::from_secs(10),
            },
            retry: RetryConfig::default(),
            binance: BinanceConfig::default(),
            key_vault: None,
            environment: Environment::Development,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.exchange.kind, ConnectorKind::Paper);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.retry.max_retries, 30);
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.environment, Environment::Test);
        assert!(config.retry.policy().is_ok());
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = Config::from_source(source(&[])).unwrap();

        assert_eq!(config.exchange.asset_a, "BTC");
        assert_eq!(config.exchange.poll_interval, Duration::from_secs(10));
        assert_eq!(config.retry.min_delay, Duration::from_secs(1));
        assert_eq!(config.retry.max_delay, Duration::from_secs(8));
        assert!(config.key_vault.is_none());
    }

    #[test]
    fn test_full_source() {
        let config = Config::from_source(source(&[
            ("TRADEGATE_ENV", "prod"),
            ("TRADEGATE_EXCHANGE", "Binance"),
            ("TRADEGATE_ASSET_A", "ETH"),
            ("TRADEGATE_ASSET_B", "BTC"),
            ("TRADEGATE_RETRY_MAX", "5"),
            ("TRADEGATE_RETRY_FACTOR", "2.0"),
            ("TRADEGATE_RETRY_MIN_DELAY_MS", "200"),
            ("TRADEGATE_RETRY_MAX_DELAY_MS", "3000"),
            ("TRADEGATE_POLL_INTERVAL_SECS", "30"),
            ("BINANCE_API_KEY", "key"),
            ("BINANCE_API_SECRET", "secret"),
            ("BINANCE_TESTNET", "true"),
            ("KEY_VAULT_ENDPOINT", "https://vault.example/graphql"),
            ("KEY_ID", "k-1"),
            ("ACCESS_TOKEN", "token"),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.exchange.kind, ConnectorKind::Binance);
        assert_eq!(config.exchange.asset_a, "ETH");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.max_delay, Duration::from_secs(3));
        assert!(config.binance.testnet);

        let vault = config.key_vault.unwrap();
        assert_eq!(vault.key_id.as_deref(), Some("k-1"));
        assert!(vault.clone_id.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_source(source(&[("TRADEGATE_ENV", "staging")])).is_err());
        assert!(Config::from_source(source(&[("TRADEGATE_EXCHANGE", "kraken")])).is_err());
        assert!(Config::from_source(source(&[("TRADEGATE_RETRY_MAX", "-1")])).is_err());
        assert!(Config::from_source(source(&[("TRADEGATE_POLL_INTERVAL_SECS", "0")])).is_err());
    }

    #[test]
    fn test_inverted_delay_bounds_are_rejected() {
        let result = Config::from_source(source(&[
            ("TRADEGATE_RETRY_MIN_DELAY_MS", "5000"),
            ("TRADEGATE_RETRY_MAX_DELAY_MS", "1000"),
        ]));
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_binance_debug_redacts_secret() {
        let config = BinanceConfig {
            api_key: Some("key".to_string()),
            api_secret: Some("hunter2".to_string()),
            testnet: false,
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
