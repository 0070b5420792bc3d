//! Error types for the HTTP collaborators

use thiserror::Error;

/// Errors raised while configuring the HTTP client
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    /// An environment variable holds an unusable value
    #[error("Invalid value for {var}: {value}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// The underlying HTTP client could not be built
    #[error("HTTP client could not be built: {0}")]
    Client(String),
}
