//! Typed error taxonomy (§7).
//!
//! Every variant maps to one of the five error kinds the spec distinguishes:
//! transient upstream, schema/validation, business-rule rejection, programmer
//! error, or fatal. Call sites convert the ones that are not truly
//! exceptional (transient, validation, business-rule) into `Ok` outcomes or
//! logged-and-skipped items rather than letting them propagate; only fatal
//! startup failures are allowed to bubble out of `main` as `anyhow::Error`.

use thiserror::Error;

pub mod blockchain;
pub use blockchain::BlockchainError;

/// Crate-wide error type. Components that need a typed error return this;
/// `main.rs` and job loops work in terms of `anyhow::Result` and rely on
/// `#[from]` to wrap it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("rpc provider {provider} error: {message}")]
    RpcProvider { provider: String, message: String },

    #[error("configuration error in {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("data error: {0}")]
    Data(String),

    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("position error: {0}")]
    Position(String),

    #[error("rate limit exceeded for {provider}")]
    RateLimit { provider: String },

    #[error("blockchain error: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Validation { field: field.into(), reason: reason.into() }
    }

    pub fn data(message: impl Into<String>) -> Self {
        EngineError::Data(message.into())
    }

    pub fn position(message: impl Into<String>) -> Self {
        EngineError::Position(message.into())
    }

    /// True for errors that §7 classifies as transient-upstream: callers
    /// should swallow these and fall through rather than propagate.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Network { .. } | EngineError::RpcProvider { .. } | EngineError::RateLimit { .. })
    }
}

/// Outcome of a Store write that can legitimately be a no-op rather than an
/// error (§7: schema/validation and business-rule rejections are not
/// exceptions). Callers match on this instead of treating `Err` as the only
/// "didn't happen" case.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOutcome {
    Applied,
    Rejected(String),
}

impl StoreOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StoreOutcome::Applied)
    }
}
