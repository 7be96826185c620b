//! Error types for the pipeline

use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum PriceError {
    /// The request could not be issued or answered
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PriceError {
    pub fn transport(msg: impl Into<String>) -> Self {
        PriceError::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        PriceError::Parse(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        PriceError::Auth(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PriceError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PriceError::Internal(msg.into())
    }

    /// Whether the failure happened before a response was received.
    ///
    /// Only these are worth retrying; a malformed body will stay malformed.
    pub fn is_transport(&self) -> bool {
        matches!(self, PriceError::Transport(_))
    }
}

/// Result type alias for pipeline operations
pub type PriceResult<T> = Result<T, PriceError>;
