//! Remote signer backed by a key-vault GraphQL service.
//!
//! The secret never leaves the vault: payloads are posted to the
//! `keyVault_SignTransaction` mutation and the vault answers with the key
//! to present and the signature.
//!
//! # Retries
//!
//! Transport failures (connection errors, timeouts, 5xx) are retried under
//! the configured [`RetryPolicy`]. GraphQL errors are answers from the
//! vault and end the request immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use tradegate_domain::Signature;
use tradegate_exec::{Completion, Outcome, RetryError, RetryExecutor, RetryPolicy, SignError, SigningPort};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

const SIGN_MUTATION: &str = "mutation keyVault_SignTransaction($transaction: String!, $keyId: String, $cloneId: String) { \
keyVault_SignTransaction(transaction: $transaction, keyId: $keyId, cloneId: $cloneId) { key signature date } }";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the key vault.
#[derive(Clone)]
pub struct KeyVaultConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,
    /// Key to sign with
    pub key_id: Option<String>,
    /// Clone the key belongs to
    pub clone_id: Option<String>,
    /// Sent in the `access_token` header
    pub access_token: Option<String>,
}

impl std::fmt::Debug for KeyVaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultConfig")
            .field("endpoint", &self.endpoint)
            .field("key_id", &self.key_id)
            .field("clone_id", &self.clone_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    variables: SignVariables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignVariables<'a> {
    transaction: &'a str,
    key_id: Option<&'a str>,
    clone_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SignData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct SignData {
    #[serde(rename = "keyVault_SignTransaction")]
    sign_transaction: Option<SignedTransaction>,
}

#[derive(Debug, Deserialize)]
struct SignedTransaction {
    key: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Turn a vault response body into a signature.
fn parse_response(body: &str) -> Result<Signature, SignError> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| SignError::Malformed(e.to_string()))?;

    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(SignError::Refused(format!("Error from graphql: {}", messages.join("; "))));
    }

    let signed = response
        .data
        .and_then(|data| data.sign_transaction)
        .ok_or_else(|| SignError::Malformed("Response carries no signature".to_string()))?;

    Ok(Signature { key: signed.key, signature: signed.signature })
}

// =============================================================================
// Key Vault Signer
// =============================================================================

/// Signs payloads through the key vault.
pub struct KeyVaultSigner {
    client: Client,
    config: KeyVaultConfig,
    retry: RetryExecutor,
}

impl KeyVaultSigner {
    /// Create a signer for `config`, retrying transport failures under `policy`.
    pub fn new(config: KeyVaultConfig, policy: RetryPolicy) -> Self {
        Self { client: Client::new(), config, retry: RetryExecutor::new(policy) }
    }

    /// One round-trip to the vault.
    async fn request(&self, payload: &str) -> Result<Signature, SignError> {
        let request = GraphQlRequest {
            query: SIGN_MUTATION,
            variables: SignVariables {
                transaction: payload,
                key_id: self.config.key_id.as_deref(),
                clone_id: self.config.clone_id.as_deref(),
            },
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(token) = &self.config.access_token {
            builder = builder.header("access_token", token);
        }

        let response = timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), builder.send())
            .await
            .map_err(|_| SignError::Transport("Request timed out".to_string()))?
            .map_err(|e| SignError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SignError::Transport(e.to_string()))?;

        if status.is_server_error() {
            return Err(SignError::Transport(format!("HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(SignError::Refused(format!("HTTP {}: {}", status, body)));
        }

        parse_response(&body)
    }
}

#[async_trait]
impl SigningPort for KeyVaultSigner {
    async fn sign(&self, payload: &str) -> Result<Signature, SignError> {
        debug!(endpoint = %self.config.endpoint, "Requesting signature from key vault");

        let result = self
            .retry
            .execute("key_vault_sign", move || async move {
                match self.request(payload).await {
                    Ok(signature) => Outcome::Ok(signature),
                    Err(e @ SignError::Transport(_)) => Outcome::retryable(e),
                    Err(e) => Outcome::Fail(e),
                }
            })
            .await;

        match result {
            Ok(Completion::Value(signature)) => Ok(signature),
            Ok(Completion::Settled(reason)) => Err(reason),
            Err(RetryError::Fatal { reason, .. }) => Err(reason),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(attempts, error = %last, "Key vault unreachable");
                Err(SignError::Exhausted { attempts, last: last.to_string() })
            },
            Err(RetryError::Cancelled { attempts }) => Err(SignError::Cancelled { attempts }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
