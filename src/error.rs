//! Error types for the signal engine.
//!
//! Bad or short input is not an error: it degrades to a HOLD response. Only
//! faults the pipeline cannot reason about cross this boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SignalError {
    pub fn internal(message: impl Into<String>) -> Self {
        SignalError::Internal {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SignalError::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
