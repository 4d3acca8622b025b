//! Engine-specific error types

use thiserror::Error;

/// Errors that can occur while driving the strategy
#[derive(Error, Debug, Clone)]
pub enum BotError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Request signing error: {0}")]
    Signing(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::JsonParse(err.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Gateway(err.to_string())
    }
}

/// Result type for engine operations
pub type BotResult<T> = std::result::Result<T, BotError>;
