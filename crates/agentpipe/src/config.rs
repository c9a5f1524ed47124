//! Agent and connection configuration

use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for an [`Agent`](crate::Agent)
///
/// Controls where the child CLI lives, how it is prompted, and the timing
/// knobs of the read loop. Timing is configuration rather than constants so
/// tests can run with millisecond intervals.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Display name, used in logs
    pub name: String,

    /// System prompt passed to the child CLI
    pub system_prompt: String,

    /// Model identifier
    pub model: String,

    /// Sandbox directory the child runs in; created on connect if missing
    pub sandbox_dir: PathBuf,

    /// API key exported to the child's environment, if required
    pub api_key: Option<String>,

    /// Path to the child CLI executable
    pub cli_path: String,

    /// Bounded wait for a single readiness poll in the read loop
    pub poll_interval: Duration,

    /// Pause after spawn before the startup liveness re-check
    pub startup_grace: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            system_prompt: "You are a helpful AI assistant.".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            sandbox_dir: PathBuf::from("./sandbox"),
            api_key: None,
            cli_path: "claude".to_string(),
            poll_interval: Duration::from_millis(100),
            startup_grace: Duration::from_millis(500),
        }
    }
}

impl AgentConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sandbox directory
    pub fn with_sandbox_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sandbox_dir = dir.into();
        self
    }

    /// Set the API key exported to the child
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the CLI executable path
    pub fn with_cli_path(mut self, path: impl Into<String>) -> Self {
        self.cli_path = path.into();
        self
    }

    /// Set the read-loop poll interval
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

/// Per-connect options
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Pass `--verbose` to the child
    pub verbose: bool,

    /// Skip the child's interactive permission prompts
    pub skip_permissions: bool,

    /// MCP server definitions keyed by snake_case name; rendered into the
    /// launch arguments with kebab-case names
    pub mcp_servers: Map<String, Value>,

    /// Resumable session key from an earlier conversation
    pub session_key: Option<String>,

    /// Ask the child to resume `session_key` instead of starting fresh
    pub resume_session: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            verbose: true,
            skip_permissions: true,
            mcp_servers: Map::new(),
            session_key: None,
            resume_session: false,
        }
    }
}

impl ConnectOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable `--verbose`
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable skipping the child's permission prompts
    pub fn with_skip_permissions(mut self, skip: bool) -> Self {
        self.skip_permissions = skip;
        self
    }

    /// Add one MCP server definition
    pub fn with_mcp_server(mut self, name: impl Into<String>, definition: Value) -> Self {
        self.mcp_servers.insert(name.into(), definition);
        self
    }

    /// Set the resumable session key
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    /// Resume the session named by the session key
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume_session = resume;
        self
    }
}
