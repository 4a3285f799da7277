//! Error types for cardkit

use thiserror::Error;

/// Result type for cardkit operations
pub type Result<T> = std::result::Result<T, CardKitError>;

/// cardkit error types
#[derive(Debug, Error)]
pub enum CardKitError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed card JSON
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Top-level value of a card file was not a JSON object
    #[error("Card document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// Class token outside the known set
    #[error("Unknown hero class: {0}")]
    UnknownClass(String),
}

impl From<serde_json::Error> for CardKitError {
    fn from(err: serde_json::Error) -> Self {
        CardKitError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for CardKitError {
    fn from(err: std::io::Error) -> Self {
        CardKitError::Io(err.to_string())
    }
}
