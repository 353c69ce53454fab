//! Error types for databasing

use thiserror::Error;

/// Result type for databasing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for databasing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid database target: {0}")]
    InvalidTarget(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Observer not found: {0}")]
    ObserverNotFound(String),

    #[error("Observer delivery failed: {0}")]
    Delivery(String),

    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

impl Error {
    /// True when a single-row fetch found nothing
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, Error::Database(sqlx::Error::RowNotFound))
    }

    /// True for errors raised by the caller's context rather than the work itself
    pub fn is_context_error(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

/// Convert Serde JSON errors to databasing errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization(error.to_string())
    }
}

/// Convert TOML deserialization errors to databasing errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Config(error.to_string())
    }
}
