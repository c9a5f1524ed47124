//! Subprocess channel for agentpipe
//!
//! Owns a child process and its three standard streams, exposing:
//!
//! - flushed line-oriented JSON writes to stdin;
//! - bounded-timeout multiplexed reads from stdout and stderr, so the
//!   caller can interleave liveness checks with I/O readiness;
//! - liveness probing and idempotent teardown.
//!
//! A [`ProcessHandle`] is exclusively owned by one session and is never
//! shared; after [`ProcessHandle::close`] every operation fails with
//! [`TransportError::Closed`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod process;

pub use error::{Result, TransportError};
pub use process::{Polled, ProcessConfig, ProcessHandle};
