//! Error types for agent operations

use agentpipe_transport::TransportError;
use std::fmt;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur during a session
///
/// Protocol-level malformations (bad JSON lines) never appear here: they are
/// logged and skipped inside the read loop. Everything that does surface
/// aborts the in-flight operation; after a `Connection` failure the caller
/// must `close()` before reconnecting.
#[derive(Debug)]
pub enum AgentError {
    /// The child failed to start, died mid-read, or a write hit a dead channel
    Connection(String),

    /// The remote side reported a failure via an `error` frame
    Terminal(String),

    /// stdout closed before a terminal frame arrived
    PrematureEndOfStream,

    /// The session was closed; no further operations are permitted
    Closed,

    /// Failed to serialize an outbound message
    Protocol(String),

    /// An observer callback failed, aborting the read loop
    Observer(String),

    /// I/O error (sandbox provisioning, stream failures)
    Io(std::io::Error),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection error: {msg}"),
            Self::Terminal(msg) => write!(f, "remote error: {msg}"),
            Self::PrematureEndOfStream => {
                write!(f, "stream ended before a terminal frame arrived")
            }
            Self::Closed => write!(f, "session is closed"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Observer(msg) => write!(f, "observer error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => Self::Connection("channel is closed".to_string()),
            TransportError::Io(io) => Self::Io(io),
            TransportError::Serialization(msg) => Self::Protocol(msg),
            TransportError::Process(msg) => Self::Connection(msg),
        }
    }
}
