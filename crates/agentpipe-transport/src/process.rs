//! Process channel: the child process and its three streams
//!
//! Reads are cooperative: [`ProcessHandle::poll_next`] waits up to a bounded
//! timeout for either output stream to produce a line, so the caller can
//! interleave liveness checks with I/O readiness instead of blocking on a
//! single stream. Worst-case latency for noticing a dead child is therefore
//! about one poll interval.

use crate::error::{Result, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// Configuration for spawning the child process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Path to the executable
    pub program: String,

    /// Arguments to pass
    pub args: Vec<String>,

    /// Extra environment variables; the parent environment is inherited
    pub env: HashMap<String, String>,

    /// Working directory for the child (the session's sandbox)
    pub workdir: PathBuf,

    /// How long a single readiness poll may block
    pub poll_interval: Duration,

    /// Pause after spawn before the startup liveness re-check
    pub startup_grace: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            workdir: PathBuf::from("."),
            poll_interval: Duration::from_millis(100),
            startup_grace: Duration::from_millis(500),
        }
    }
}

impl ProcessConfig {
    /// Create a new process configuration
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the argument list
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Set an environment variable for the child
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the startup grace period
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }
}

/// One unit of progress from a readiness poll
#[derive(Debug)]
pub enum Polled {
    /// A protocol line from stdout
    Stdout(String),

    /// A diagnostic line from stderr
    Stderr(String),

    /// stdout reached end of stream
    StdoutClosed,

    /// Neither stream produced a line within the poll interval
    Idle,
}

/// Handle to a running child process
///
/// Exclusively owned by one session. Streams become `None` after
/// [`ProcessHandle::close`]; a closed handle fails every operation with
/// [`TransportError::Closed`] instead of touching a dead process.
pub struct ProcessHandle {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
    stderr: Option<Lines<BufReader<ChildStderr>>>,
    config: ProcessConfig,
}

enum Picked {
    Stdout(std::io::Result<Option<String>>),
    Stderr(std::io::Result<Option<String>>),
    Timeout,
}

impl ProcessHandle {
    /// Spawn the child with all three streams captured
    ///
    /// The child inherits the parent environment plus whatever
    /// [`ProcessConfig::with_env`] added, and runs with its working
    /// directory set to the configured sandbox.
    pub async fn spawn(config: ProcessConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .envs(&config.env)
            .current_dir(&config.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %config.program,
            workdir = %config.workdir.display(),
            "spawning child process"
        );

        let mut child = cmd.spawn().map_err(|e| {
            TransportError::Process(format!("failed to spawn {}: {e}", config.program))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Process("child stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Process("child stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Process("child stderr not captured".to_string()))?;

        Ok(Self {
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            stdout: Some(BufReader::new(stdout).lines()),
            stderr: Some(BufReader::new(stderr).lines()),
            config,
        })
    }

    /// Serialize one message as a single JSON line and flush it to stdin
    ///
    /// Fails with a process error if the child is dead at write time, and
    /// with [`TransportError::Closed`] if stdin is gone.
    pub async fn write_line(&mut self, message: &Value) -> Result<()> {
        if !self.is_alive() {
            return Err(TransportError::Process(
                "child process is not alive".to_string(),
            ));
        }
        let stdin = self.stdin.as_mut().ok_or(TransportError::Closed)?;

        let json = serde_json::to_string(message)?;
        stdin.write_all(json.as_bytes()).await.map_err(write_error)?;
        stdin.write_all(b"\n").await.map_err(write_error)?;
        stdin.flush().await.map_err(write_error)?;
        Ok(())
    }

    /// Wait up to `timeout` for either output stream to produce a line
    ///
    /// stdout is preferred when both streams are ready. A stderr end-of-stream
    /// is folded into [`Polled::Idle`]; a stdout end-of-stream is reported as
    /// [`Polled::StdoutClosed`] since it ends the protocol.
    pub async fn poll_next(&mut self, timeout: Duration) -> Result<Polled> {
        let stdout = self.stdout.as_mut().ok_or(TransportError::Closed)?;
        let stderr = self.stderr.as_mut();
        let stderr_open = stderr.is_some();

        let picked = tokio::select! {
            biased;
            line = stdout.next_line() => Picked::Stdout(line),
            line = next_stderr_line(stderr), if stderr_open => Picked::Stderr(line),
            _ = tokio::time::sleep(timeout) => Picked::Timeout,
        };

        match picked {
            Picked::Stdout(line) => match line? {
                Some(line) => Ok(Polled::Stdout(line)),
                None => Ok(Polled::StdoutClosed),
            },
            Picked::Stderr(line) => match line? {
                Some(line) => Ok(Polled::Stderr(line)),
                None => {
                    // stderr is done; stop selecting on it
                    self.stderr = None;
                    Ok(Polled::Idle)
                }
            },
            Picked::Timeout => Ok(Polled::Idle),
        }
    }

    /// Whether the child process is still running
    pub fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => child.try_wait().ok().flatten().is_none(),
            None => false,
        }
    }

    /// OS process id of the child, if it is still owned
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Collect whatever stderr output is available within `budget`
    ///
    /// Used when the child dies, so the failure can carry its diagnostics.
    /// Returns an empty string when nothing is readable.
    pub async fn drain_stderr(&mut self, budget: Duration) -> String {
        let mut collected = String::new();
        let Some(stderr) = self.stderr.as_mut() else {
            return collected;
        };

        let deadline = tokio::time::Instant::now() + budget;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, stderr.next_line()).await {
                Ok(Ok(Some(line))) => {
                    if !collected.is_empty() {
                        collected.push('\n');
                    }
                    collected.push_str(&line);
                }
                Ok(Ok(None)) | Ok(Err(_)) | Err(_) => break,
            }
        }
        collected
    }

    /// Close all three streams and wait for the child to exit
    ///
    /// Idempotent: closing a closed handle is a no-op. The handle is reset
    /// to the empty state even if a teardown step fails, so it can never be
    /// reused half-closed. A child that outlives `wait_budget` is killed.
    pub async fn close(&mut self, wait_budget: Duration) -> Result<()> {
        // Dropping the writer closes the child's stdin, which is the
        // cooperative shutdown signal.
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        match tokio::time::timeout(wait_budget, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(%status, "child process exited");
                Ok(())
            }
            Ok(Err(err)) => Err(TransportError::Io(err)),
            Err(_) => {
                tracing::warn!("child process did not exit in time, killing it");
                child.kill().await.map_err(|e| {
                    TransportError::Process(format!("failed to kill child: {e}"))
                })
            }
        }
    }

    /// The configuration this handle was spawned with
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
}

// A child can die between the liveness check and the write; the resulting
// broken pipe is a dead-channel condition, not a generic I/O failure.
fn write_error(err: std::io::Error) -> TransportError {
    if err.kind() == std::io::ErrorKind::BrokenPipe {
        TransportError::Process(format!("child process closed stdin: {err}"))
    } else {
        TransportError::Io(err)
    }
}

async fn next_stderr_line(
    stderr: Option<&mut Lines<BufReader<ChildStderr>>>,
) -> std::io::Result<Option<String>> {
    match stderr {
        Some(lines) => lines.next_line().await,
        // Disabled branch; never polled, but must still typecheck
        None => std::future::pending().await,
    }
}
