//! Error types for lexiscope-core

use thiserror::Error;

/// Main error type for the lexiscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// The store did not answer a handshake or a request never reached it
    #[error("connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a query or insert
    #[error("query execution error: {0}")]
    Query(String),

    /// Chart name is not part of the catalog
    #[error("chart not found: {0}")]
    UnknownChart(String),

    /// A chart parameter is missing or malformed
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for lexiscope-core
pub type Result<T> = std::result::Result<T, Error>;
