//! Builds the child CLI invocation
//!
//! The child is expected to speak stream-json on both stdin and stdout;
//! everything else here is the knobs the CLI exposes for prompting, model
//! selection, MCP servers, and session resumption. Arguments are passed to
//! the process directly, so no shell quoting is involved.

use crate::config::{AgentConfig, ConnectOptions};
use serde_json::{Map, Value, json};

/// Program and argument list for one spawn
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    /// Executable to run
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,
}

/// Assemble the launch invocation from configuration and connect options
pub fn build_launch(config: &AgentConfig, options: &ConnectOptions) -> LaunchSpec {
    let mut args = vec![
        "-p".to_string(),
        "--output-format=stream-json".to_string(),
        "--input-format=stream-json".to_string(),
    ];

    if options.skip_permissions {
        args.push("--dangerously-skip-permissions".to_string());
    }
    if options.verbose {
        args.push("--verbose".to_string());
    }

    args.push("--system-prompt".to_string());
    args.push(config.system_prompt.clone());
    args.push("--model".to_string());
    args.push(config.model.clone());

    if !options.mcp_servers.is_empty() {
        args.push("--mcp-config".to_string());
        args.push(mcp_config_json(&options.mcp_servers));
    }

    // Keep the child from picking up ambient settings files.
    args.push("--setting-sources".to_string());
    args.push(String::new());

    if options.resume_session {
        if let Some(key) = &options.session_key {
            args.push("--resume".to_string());
            args.push(key.clone());
        }
    }

    LaunchSpec {
        program: config.cli_path.clone(),
        args,
    }
}

/// Render the MCP configuration JSON, kebab-casing server names the way the
/// CLI expects them
fn mcp_config_json(servers: &Map<String, Value>) -> String {
    let renamed: Map<String, Value> = servers
        .iter()
        .map(|(name, definition)| (name.replace('_', "-"), definition.clone()))
        .collect();
    json!({ "mcpServers": renamed }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AgentConfig {
        AgentConfig::new()
            .with_system_prompt("Be brief.")
            .with_model("claude-sonnet-4-5-20250929")
            .with_cli_path("/opt/bin/claude")
    }

    fn arg_after<'a>(spec: &'a LaunchSpec, flag: &str) -> Option<&'a str> {
        let idx = spec.args.iter().position(|a| a == flag)?;
        spec.args.get(idx + 1).map(String::as_str)
    }

    #[test]
    fn baseline_invocation() {
        let spec = build_launch(&test_config(), &ConnectOptions::default());

        assert_eq!(spec.program, "/opt/bin/claude");
        assert_eq!(spec.args[0], "-p");
        assert!(spec.args.contains(&"--output-format=stream-json".to_string()));
        assert!(spec.args.contains(&"--input-format=stream-json".to_string()));
        assert!(spec.args.contains(&"--dangerously-skip-permissions".to_string()));
        assert!(spec.args.contains(&"--verbose".to_string()));
        assert_eq!(arg_after(&spec, "--system-prompt"), Some("Be brief."));
        assert_eq!(arg_after(&spec, "--model"), Some("claude-sonnet-4-5-20250929"));
        assert_eq!(arg_after(&spec, "--setting-sources"), Some(""));
        assert!(!spec.args.contains(&"--mcp-config".to_string()));
        assert!(!spec.args.contains(&"--resume".to_string()));
    }

    #[test]
    fn quiet_and_prompting_invocation() {
        let options = ConnectOptions::new()
            .with_verbose(false)
            .with_skip_permissions(false);
        let spec = build_launch(&test_config(), &options);

        assert!(!spec.args.contains(&"--verbose".to_string()));
        assert!(!spec.args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn mcp_server_names_are_kebab_cased() {
        let options = ConnectOptions::new().with_mcp_server(
            "headless_browser",
            serde_json::json!({"type": "http", "url": "http://0.0.0.0:4567/mcp"}),
        );
        let spec = build_launch(&test_config(), &options);

        let rendered = arg_after(&spec, "--mcp-config").expect("mcp config present");
        let value: Value = serde_json::from_str(rendered).expect("valid JSON");
        assert!(value["mcpServers"]["headless-browser"].is_object());
        assert!(value["mcpServers"].get("headless_browser").is_none());
    }

    #[test]
    fn resume_requires_both_flag_and_key() {
        let without_key = ConnectOptions::new().resume(true);
        let spec = build_launch(&test_config(), &without_key);
        assert!(!spec.args.contains(&"--resume".to_string()));

        let with_key = ConnectOptions::new().with_session_key("sess-7").resume(true);
        let spec = build_launch(&test_config(), &with_key);
        assert_eq!(arg_after(&spec, "--resume"), Some("sess-7"));

        let key_without_resume = ConnectOptions::new().with_session_key("sess-7");
        let spec = build_launch(&test_config(), &key_without_resume);
        assert!(!spec.args.contains(&"--resume".to_string()));
    }
}
