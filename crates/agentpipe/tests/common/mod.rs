//! Shared fixtures for session integration tests
//!
//! [`fake_cli`] stands in a shell script for the real CLI binary. The
//! script receives user turns on stdin and emits stream frames on stdout,
//! which is all the session layer ever sees of the child.

use agentpipe::AgentConfig;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;
use tempfile::TempDir;

/// A scripted stand-in child process plus a config pointed at it
pub struct FakeCli {
    /// Keeps the script and sandbox alive for the test's duration
    #[allow(dead_code)]
    pub dir: TempDir,
    pub config: AgentConfig,
}

/// Write `script_body` as an executable `/bin/sh` script and build an
/// [`AgentConfig`] that launches it with fast polling
pub fn fake_cli(script_body: &str) -> FakeCli {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("fake-cli");
    fs::write(&script, format!("#!/bin/sh\n{script_body}\n")).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let sandbox = dir.path().join("sandbox");
    fs::create_dir(&sandbox).unwrap();

    let config = AgentConfig::new()
        .with_name("test-agent")
        .with_cli_path(script.to_str().unwrap())
        .with_sandbox_dir(&sandbox)
        .with_poll_interval(Duration::from_millis(20))
        .with_startup_grace(Duration::from_millis(80));

    FakeCli { dir, config }
}
