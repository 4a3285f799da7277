//! Error types for the engine bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Engine bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Engine process could not be started
    #[error("Launch error: {0}")]
    Launch(String),

    /// IPC communication error
    #[error("IPC error: {0}")]
    IpcError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Unexpected message from the engine
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The engine reported an error for a call
    #[error("Engine error {code}: {message}")]
    Remote { code: i32, message: String },

    /// Operation did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The context has been closed
    #[error("Engine context is closed")]
    Closed,
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationError(err.to_string())
    }
}
