//! Error types for the BridgePay service

use thiserror::Error;

/// Main error type for the transfer workflow
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Token {token} is not supported")]
    UnsupportedToken { token: String },

    #[error("Couldn't get prices for {origin} or {destination}")]
    PriceUnavailable { origin: String, destination: String },

    #[error("Price API error: {0}")]
    PriceApi(#[from] reqwest::Error),

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("No transaction to {operation}")]
    MissingDraft { operation: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Check if the error is caused by caller input (as opposed to an
    /// upstream dependency)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BridgeError::Validation { .. }
                | BridgeError::UnsupportedToken { .. }
                | BridgeError::MissingDraft { .. }
        )
    }

    /// Message safe to surface directly in a client UI. Transport errors
    /// are collapsed so upstream URLs and internals don't leak.
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::PriceApi(_) => "Price service is unavailable, try again".to_string(),
            BridgeError::Internal(_) => "Something went wrong, try again".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for workflow operations
pub type BridgeResult<T> = Result<T, BridgeError>;
