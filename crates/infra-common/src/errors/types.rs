use thiserror::Error;

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the shared infrastructure
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The task queue behind a dispatcher has been dropped or shut down
    #[error("Dispatcher '{dispatcher}' is closed")]
    DispatcherClosed { dispatcher: String },

    /// The global tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a dispatcher-closed error for the named dispatcher
    pub fn dispatcher_closed(dispatcher: impl Into<String>) -> Self {
        Self::DispatcherClosed {
            dispatcher: dispatcher.into(),
        }
    }

    /// Check whether this error means the serialization domain is gone
    pub fn is_dispatcher_closed(&self) -> bool {
        matches!(self, Self::DispatcherClosed { .. })
    }
}
