//! Error types for eosrelay

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid account name: {0}")]
    InvalidName(String),

    #[error("Invalid asset amount: {0}")]
    InvalidAsset(String),

    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    #[error("Ledger connection error: {0}")]
    ConnectionError(String),

    #[error("Ledger rejected transaction: {0}")]
    Rejected(String),

    #[error("Malformed ledger response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, RelayError>;
