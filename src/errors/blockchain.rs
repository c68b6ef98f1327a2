//! Chain-fetch error classification for `ChainClient` implementations.
//!
//! Distinguishes failures a retry on the *next tick* can fix (rate limits,
//! transport hiccups) from ones that mean the wallet/chain pairing itself is
//! wrong. A single wallet failing this way never aborts the rest of the
//! batch (§4.3).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum BlockchainError {
    #[error("rate limited by {provider} (retry after {retry_after_ms}ms)")]
    RateLimited { provider: String, retry_after_ms: u64 },

    #[error("transport error reaching {provider}: {message}")]
    Transport { provider: String, message: String },

    #[error("non-2xx response from {provider}: status {status}")]
    HttpStatus { provider: String, status: u16 },

    #[error("malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("unsupported chain for this client: {chain}")]
    UnsupportedChain { chain: String },

    #[error("timed out after {timeout_ms}ms calling {provider}")]
    Timeout { provider: String, timeout_ms: u64 },
}

impl BlockchainError {
    /// All current variants are transient from the scheduler's point of
    /// view: the wallet is reported failed for this tick and its cursor is
    /// not advanced, but the batch continues (§4.3).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BlockchainError::UnsupportedChain { .. })
    }
}
