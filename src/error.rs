//! Error types for paygate.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in paygate.
///
/// Collaborator failures during a gate decision are caught at the verifier
/// boundary and surface as a failed verification, not as one of these; this
/// type covers construction, configuration and collaborator-internal errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Token decode/validation error.
    #[error("token error: {0}")]
    Token(String),

    /// On-chain lookup error.
    #[error("chain lookup error: {0}")]
    Chain(String),

    /// Network error talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
