//! Error types for ElGamal operations

use thiserror::Error;

/// Result type alias for ElGamal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating keys, signing or verifying
#[derive(Debug, Error)]
pub enum Error {
    /// Framed data could not be parsed, or a signature did not verify
    #[error("File corrupted or falsified: {0}")]
    Corruption(String),

    /// Underlying file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message cannot be signed without breaking the framing
    #[error("Message cannot be framed: {0}")]
    Unframeable(String),

    /// Invalid engine configuration or sampling bounds
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file is not valid JSON
    #[error("Configuration parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// A randomized retry loop gave up
    #[error("Gave up on {operation} after {attempts} attempts")]
    RetryBudgetExhausted {
        operation: &'static str,
        attempts: usize,
    },

    /// Arithmetic invariant violated
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand used by the codec and the verifier
    pub(crate) fn corruption(reason: impl Into<String>) -> Self {
        Error::Corruption(reason.into())
    }

    /// Whether this error means the data was malformed or forged
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}
