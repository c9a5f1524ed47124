//! Transport error types

use std::fmt;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur in transport operations
#[derive(Debug)]
pub enum TransportError {
    /// The handle was already closed; its streams are gone
    Closed,

    /// Failed to spawn or manage the child process
    Process(String),

    /// I/O failure on one of the child's streams
    Io(std::io::Error),

    /// Failed to serialize an outbound message
    Serialization(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "channel is closed"),
            Self::Process(msg) => write!(f, "process error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
