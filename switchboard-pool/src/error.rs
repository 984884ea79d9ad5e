//! Error types for pool operations.

use thiserror::Error;

/// Everything that can go wrong while routing a request through the pool.
///
/// Per-attempt failures (`Transport`, `Upstream`, `Decode`) are absorbed by
/// the dispatcher's failover loop and only ever reach the caller wrapped in
/// `Exhausted`. The remaining variants are terminal and surface as-is.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A protocol tag does not name a supported backend kind.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Network-level failure reaching a provider.
    #[error("transport error: {0}")]
    Transport(String),

    /// A provider answered with a non-200 status.
    #[error("upstream error from {provider}: status {status}: {message}")]
    Upstream {
        provider: String,
        status: u16,
        message: String,
    },

    /// A provider's response body did not match its wire schema.
    #[error("decode error: {0}")]
    Decode(String),

    /// The registry holds no providers.
    #[error("no providers available")]
    NoProviders,

    /// Every attempt failed; carries the most recent underlying error.
    #[error("all providers failed after {attempts} attempts, last error: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Box<PoolError>,
    },

    /// Caller content cannot be represented by the selected wire format.
    /// A defect in the caller/provider pairing, never downgraded.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PoolError {
    /// Whether the failover loop may continue to another provider after
    /// this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Upstream { .. } | Self::Decode(_)
        )
    }
}

impl From<reqwest::Error> for PoolError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
