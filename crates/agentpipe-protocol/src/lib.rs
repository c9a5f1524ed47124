//! Wire types and event-frame codec for the agentpipe streaming protocol
//!
//! The child process speaks line-delimited JSON in both directions:
//!
//! - **stdin** (caller → child): one [`UserTurn`] per line.
//! - **stdout** (child → caller): heterogeneous event frames classified by
//!   their top-level `type` field, decoded by [`parse_line`] into
//!   [`EventFrame`] values.
//!
//! This crate is pure data: no I/O, no process management. Malformed input
//! produces recoverable errors, never panics, so a single bad line can be
//! logged and skipped without aborting the stream.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod frame;
pub mod wire;

pub use frame::{
    AssistantContent, ContentBlock, EventFrame, FrameKind, FrameParseError, parse_line,
};
pub use wire::UserTurn;
