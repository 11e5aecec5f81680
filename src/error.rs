//! Error types for the fan-out service.

use thiserror::Error;

/// Main error type for subscribe and publish operations.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("Subscription store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for PubSubError {
    fn from(e: serde_json::Error) -> Self {
        PubSubError::Serialization(e.to_string())
    }
}

/// Result type for fan-out operations.
pub type Result<T> = std::result::Result<T, PubSubError>;
