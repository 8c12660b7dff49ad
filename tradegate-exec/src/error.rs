//! Execution layer error types.

use thiserror::Error;
use tradegate_domain::DomainError;
use tradegate_engine::{EngineError, RejectReason};

use crate::ports::{ConnectorError, SignError};
use crate::retry::RetryError;

/// Errors that can occur during facade operations.
///
/// Every failure coming out of the connector, the engine or the retry loop
/// is normalized into this type at the facade boundary.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Market configuration error (no market for the active pair)
    #[error("Market configuration error: {0}")]
    Market(#[from] EngineError),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Order failed admissibility checks
    #[error("The order is invalid: {0}")]
    InvalidOrder(RejectReason),

    /// Exchange communication error (not retried, or not retryable)
    #[error("Exchange error: {0}")]
    Exchange(#[from] ConnectorError),

    /// Retries consumed without success
    #[error("Exchange call failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Total attempts made
        attempts: u32,
        /// Last retryable error observed
        last: ConnectorError,
    },

    /// The exchange reported the request as already in effect
    #[error("Request already in effect: {0}")]
    Acknowledged(String),

    /// Signing service error
    #[error("Signing error: {0}")]
    Signing(#[from] SignError),

    /// Operation cancelled before it could complete
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExecError {
    /// Whether the exchange treated the request as already satisfied.
    ///
    /// This is not a failure of the request, only a non-default
    /// acknowledgement.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, ExecError::Acknowledged(_))
    }
}

impl From<RetryError<ConnectorError>> for ExecError {
    fn from(err: RetryError<ConnectorError>) -> Self {
        match err {
            RetryError::Fatal { reason, .. } => ExecError::Exchange(reason),
            RetryError::Exhausted { attempts, last } => ExecError::RetriesExhausted { attempts, last },
            RetryError::Cancelled { .. } => ExecError::Cancelled,
        }
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
