//! Interactive console session against a local `claude` CLI
//!
//! Run with `cargo run --example console`. Reads one question per line from
//! stdin and prints the accumulated answer. Set `RUST_LOG=agentpipe=debug`
//! to watch frame traffic.

use agentpipe::{Agent, AgentConfig, CallbackRegistry, ConnectOptions};
use std::io::{BufRead, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AgentConfig::new()
        .with_name("console")
        .with_system_prompt("You are a concise assistant. Answer in a sentence or two.")
        .with_sandbox_dir("./console_sandbox");

    let observers = CallbackRegistry::new().on_named("trace-types", |event| {
        if let Some(kind) = event.get("type").and_then(|v| v.as_str()) {
            tracing::debug!(frame = kind, "observed frame");
        }
        Ok(())
    });

    let mut agent = Agent::with_observers(config, observers);
    agent.connect(ConnectOptions::new()).await?;
    println!("Connected. Type a question, or an empty line to quit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        match agent.ask(question).await {
            Ok(Some(answer)) => println!("{answer}\n"),
            Ok(None) => {}
            Err(e) => {
                eprintln!("ask failed: {e}");
                break;
            }
        }
    }

    if let Some(key) = agent.session_key() {
        println!("Session key (resumable): {key}");
    }
    agent.close().await?;
    Ok(())
}
