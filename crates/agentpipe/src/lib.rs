//! agentpipe: drive a stream-json CLI agent from Rust
//!
//! Manages a long-running child process that speaks line-delimited JSON over
//! its standard streams, translating between a synchronous ask-a-question,
//! get-a-text-answer API and the asynchronous event stream the child emits.
//!
//! # Architecture
//!
//! Three layers, leaf to root:
//!
//! 1. **Protocol** (`agentpipe-protocol`): wire types and the event-frame codec
//! 2. **Transport** (`agentpipe-transport`): subprocess channel with bounded
//!    cooperative polling
//! 3. **Agent** (this crate): configuration, launch builder, observers,
//!    response accumulation, and the session state machine
//!
//! # Usage
//!
//! ```no_run
//! use agentpipe::{Agent, AgentConfig, ConnectOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::new()
//!         .with_name("assistant")
//!         .with_system_prompt("You are a helpful AI assistant.");
//!
//!     let mut agent = Agent::new(config);
//!     agent.connect(ConnectOptions::default()).await?;
//!
//!     if let Some(answer) = agent.ask("What is 2+2?").await? {
//!         println!("{answer}");
//!     }
//!
//!     agent.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! One `ask` is fully drained before the next may begin; the `&mut self`
//! methods make that structural rather than a runtime check.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod accumulator;
pub mod config;
pub mod error;
pub mod event_log;
pub mod launch;
pub mod observers;
pub mod session;

pub use accumulator::{Fold, ResponseBuffer};
pub use config::{AgentConfig, ConnectOptions};
pub use error::{AgentError, Result};
pub use event_log::EventLog;
pub use launch::{LaunchSpec, build_launch};
pub use observers::{CallbackRegistry, Observer, ObserverFn};
pub use session::Agent;
