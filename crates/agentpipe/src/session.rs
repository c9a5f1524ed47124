//! Session controller: connect, ask, drain, close
//!
//! Drives the state machine
//! `Unconnected → Connected → (per-ask: Sending → Draining) → Connected → … → Closed`.
//! The read loop is cooperative polling with a bounded timeout rather than a
//! dedicated reader task, so a dead child is noticed within roughly one poll
//! interval and a stalled child never wedges the caller for longer than the
//! interval per iteration.

use crate::accumulator::{Fold, ResponseBuffer};
use crate::config::{AgentConfig, ConnectOptions};
use crate::error::{AgentError, Result};
use crate::event_log::EventLog;
use crate::launch::build_launch;
use crate::observers::CallbackRegistry;
use agentpipe_protocol::{UserTurn, parse_line};
use agentpipe_transport::{Polled, ProcessConfig, ProcessHandle};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::time::Duration;

/// Budget for collecting stderr once the child is known to be dead
const STDERR_DRAIN_BUDGET: Duration = Duration::from_millis(250);

/// How long close waits for the child before killing it
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unconnected,
    Connected,
    Closed,
}

/// One conversation bound to one child process
///
/// Owns at most one process channel at a time. `ask` calls cannot interleave:
/// every method takes `&mut self`, so one ask is fully drained before the
/// next may begin.
pub struct Agent {
    config: AgentConfig,
    observers: CallbackRegistry,
    log: EventLog,
    channel: Option<ProcessHandle>,
    state: SessionState,
    session_key: Option<String>,
}

impl Agent {
    /// Create an agent with no observers
    pub fn new(config: AgentConfig) -> Self {
        Self::with_observers(config, CallbackRegistry::new())
    }

    /// Create an agent with a pre-built observer registry
    pub fn with_observers(config: AgentConfig, observers: CallbackRegistry) -> Self {
        Self {
            config,
            observers,
            log: EventLog::new(),
            channel: None,
            state: SessionState::Unconnected,
            session_key: None,
        }
    }

    /// Display name of this agent
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration this agent was built with
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The resumable session key, once the child has reported one
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    /// Whether the session is in the connected state
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Snapshot of the injected-event log
    pub fn event_log(&self) -> Vec<Value> {
        self.log.snapshot()
    }

    /// Inject a synthetic event: log it and dispatch it to observers as if
    /// it had arrived on the stream
    pub fn inject_event(&self, event: Value) -> Result<()> {
        self.log.append(event.clone());
        self.observers.dispatch(&event)
    }

    /// Spawn the child process and verify it survives startup
    ///
    /// Provisions the sandbox directory, builds the launch invocation, and
    /// pauses for the configured grace period before re-checking liveness.
    /// On failure the session stays unconnected and the error carries
    /// whatever stderr the child managed to emit; this is the only point
    /// where a startup failure is distinguishable from a slow starter.
    pub async fn connect(&mut self, options: ConnectOptions) -> Result<()> {
        match self.state {
            SessionState::Closed => return Err(AgentError::Closed),
            SessionState::Connected => {
                return Err(AgentError::Connection("already connected".to_string()));
            }
            SessionState::Unconnected => {}
        }

        tokio::fs::create_dir_all(&self.config.sandbox_dir).await?;

        let launch = build_launch(&self.config, &options);
        tracing::info!(
            agent = %self.config.name,
            program = %launch.program,
            "starting child process"
        );

        let mut process_config = ProcessConfig::new(&launch.program)
            .with_args(launch.args)
            .with_workdir(self.config.sandbox_dir.clone())
            .with_poll_interval(self.config.poll_interval)
            .with_startup_grace(self.config.startup_grace);
        if let Some(key) = &self.config.api_key {
            process_config = process_config.with_env("ANTHROPIC_API_KEY", key);
        }

        let mut channel = ProcessHandle::spawn(process_config).await?;

        tokio::time::sleep(self.config.startup_grace).await;
        if !channel.is_alive() {
            let stderr = channel.drain_stderr(STDERR_DRAIN_BUDGET).await;
            let _ = channel.close(SHUTDOWN_WAIT).await;
            return Err(AgentError::Connection(format!(
                "child process failed to start: {stderr}"
            )));
        }

        tracing::info!(
            agent = %self.config.name,
            pid = ?channel.id(),
            "child process started"
        );

        self.session_key = options.session_key.clone();
        if self.session_key.is_none() {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            self.inject_event(json!({
                "type": "system",
                "subtype": "prompt",
                "system_prompt": self.config.system_prompt,
                "timestamp": now,
                "received_at": now,
            }))?;
        }

        self.channel = Some(channel);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Send one user turn and drain the stream until a terminal frame
    ///
    /// Returns the accumulated response text. Empty and whitespace-only
    /// messages are a no-op returning `Ok(None)` without touching the
    /// channel. There is no total-duration timeout: an unresponsive child
    /// stalls the ask until it exits or emits a terminal frame.
    pub async fn ask(&mut self, message: impl AsRef<str>) -> Result<Option<String>> {
        if self.state == SessionState::Closed {
            return Err(AgentError::Closed);
        }
        let message = message.as_ref().trim();
        if message.is_empty() {
            return Ok(None);
        }
        if self.state != SessionState::Connected {
            return Err(AgentError::Connection("not connected".to_string()));
        }

        self.send_user_turn(message).await?;
        self.drain_response().await.map(Some)
    }

    /// Close the channel and end the session
    ///
    /// Idempotent. The session reaches the closed state even if teardown
    /// fails partway; no further asks are permitted afterwards.
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        if let Some(mut channel) = self.channel.take() {
            channel.close(SHUTDOWN_WAIT).await?;
        }
        Ok(())
    }

    async fn send_user_turn(&mut self, message: &str) -> Result<()> {
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| AgentError::Connection("no process channel".to_string()))?;

        if !channel.is_alive() {
            let stderr = channel.drain_stderr(STDERR_DRAIN_BUDGET).await;
            return Err(AgentError::Connection(format!(
                "child process has died: {stderr}"
            )));
        }

        let mut turn = UserTurn::new(message);
        if let Some(key) = &self.session_key {
            turn = turn.with_session(key.clone());
        }
        let value = serde_json::to_value(&turn).map_err(|e| AgentError::Protocol(e.to_string()))?;
        channel.write_line(&value).await?;

        tracing::debug!(agent = %self.config.name, "user turn sent");
        Ok(())
    }

    async fn drain_response(&mut self) -> Result<String> {
        let poll_interval = self.config.poll_interval;
        let mut buffer = ResponseBuffer::new();

        loop {
            let channel = self
                .channel
                .as_mut()
                .ok_or_else(|| AgentError::Connection("no process channel".to_string()))?;

            match channel.poll_next(poll_interval).await? {
                Polled::Idle => {
                    // Nothing readable this tick; make sure the child is
                    // still there before waiting again.
                    if !channel.is_alive() {
                        let stderr = channel.drain_stderr(STDERR_DRAIN_BUDGET).await;
                        return Err(AgentError::Connection(format!(
                            "child process died while reading response: {stderr}"
                        )));
                    }
                }
                Polled::Stderr(line) => {
                    tracing::warn!(agent = %self.config.name, "child stderr: {line}");
                }
                Polled::StdoutClosed => {
                    return Err(AgentError::PrematureEndOfStream);
                }
                Polled::Stdout(line) => {
                    let frame = match parse_line(&line) {
                        Ok(Some(frame)) => frame,
                        Ok(None) => continue,
                        Err(err) => {
                            tracing::warn!(
                                agent = %self.config.name,
                                %err,
                                "skipping malformed frame: {}",
                                truncate_for_log(&line)
                            );
                            continue;
                        }
                    };

                    if let Some(id) = frame.session_id() {
                        if self.session_key.as_deref() != Some(id) {
                            self.session_key = Some(id.to_string());
                        }
                    }

                    self.observers.dispatch(frame.raw())?;

                    match buffer.absorb(&frame) {
                        Fold::Continue => {}
                        Fold::Complete => return Ok(buffer.into_text()),
                        Fold::Terminated(message) => return Err(AgentError::Terminal(message)),
                    }
                }
            }
        }
    }
}

fn truncate_for_log(line: &str) -> &str {
    match line.char_indices().nth(100) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
