//! Error types for the ballast core library.

use thiserror::Error;

/// Main error type for ballast operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The router has no registered endpoints to deliver to
    #[error("no route available: endpoint set is empty")]
    NoRouteAvailable,

    /// Invalid payload construction
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// Why the payload was rejected
        reason: String,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },

    /// Lifecycle errors (startup and shutdown)
    #[error("lifecycle error: {message}")]
    Lifecycle {
        /// Description of the lifecycle failure
        message: String,
    },
}

/// Result type alias for ballast operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a configuration error from any displayable cause.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration { message: message.into() }
    }

    /// Build a lifecycle error from any displayable cause.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Error::Lifecycle { message: message.into() }
    }
}
