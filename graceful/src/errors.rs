//! Error types for the graceful crate.
//!
//! The coordinator itself never fails; these errors come from the layers
//! around it (configuration loading, tracing setup, runtime construction).

use thiserror::Error;

/// The main error type for graceful operations.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// A configuration value could not be parsed.
    #[error("Invalid configuration for {key}: {message}")]
    InvalidConfig {
        /// The offending key.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The tracing subscriber could not be installed.
    #[error("Tracing error: {0}")]
    Tracing(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShutdownError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result alias for graceful operations.
pub type Result<T> = std::result::Result<T, ShutdownError>;
