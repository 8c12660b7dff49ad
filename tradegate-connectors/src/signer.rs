//! Local HMAC SHA256 signer.
//!
//! Binance signs request query strings with the account's API secret.
//! The signature travels as a hex string alongside the API key.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use tradegate_domain::Signature;
use tradegate_exec::{SignError, SigningPort};

type HmacSha256 = Hmac<Sha256>;

/// Signs payloads in-process with an API secret.
pub struct HmacSigner {
    api_key: String,
    api_secret: String,
}

impl HmacSigner {
    /// Create a signer for an API key / secret pair.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), api_secret: api_secret.into() }
    }

    /// Hex-encoded HMAC SHA256 of `payload`.
    pub fn digest(&self, payload: &str) -> Result<String, SignError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| SignError::InvalidKey(format!("HMAC error: {}", e)))?;

        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl SigningPort for HmacSigner {
    async fn sign(&self, payload: &str) -> Result<Signature, SignError> {
        Ok(Signature { key: self.api_key.clone(), signature: self.digest(payload)? })
    }
}
