//! Error types for rcast-session-core
//!
//! Launch failures never surface here: they reach callers through
//! [`SessionObserver::on_session_launch_error`](crate::orchestrator::SessionObserver::on_session_launch_error).
//! `CastError` covers the setup paths around the orchestrator and aggregator.

use thiserror::Error;

/// Result type for session-core operations
pub type Result<T> = std::result::Result<T, CastError>;

/// Errors raised while configuring or wiring the cast core
#[derive(Debug, Error)]
pub enum CastError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Media source URN could not be parsed
    #[error("Invalid media source '{source_id}': {reason}")]
    InvalidSource { source_id: String, reason: String },

    /// Application identity cannot be turned into a sink selector
    #[error("Invalid application id: '{application_id}'")]
    InvalidApplicationId { application_id: String },

    /// The serialization domain rejected work
    #[error("Dispatcher error: {message}")]
    Dispatcher { message: String },

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CastError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid source error
    pub fn invalid_source(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<rcast_infra_common::Error> for CastError {
    fn from(err: rcast_infra_common::Error) -> Self {
        match err {
            rcast_infra_common::Error::Config(message) => CastError::Config { message },
            other @ rcast_infra_common::Error::DispatcherClosed { .. } => CastError::Dispatcher {
                message: other.to_string(),
            },
            other => CastError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<toml::de::Error> for CastError {
    fn from(err: toml::de::Error) -> Self {
        CastError::config(format!("Failed to parse TOML: {}", err))
    }
}
