//! End-to-end session tests against scripted fake CLI processes

mod common;

use agentpipe::{Agent, AgentError, CallbackRegistry, ConnectOptions};
use common::fake_cli;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Responds to every user turn with one assistant frame and a result frame
const HELLO_SCRIPT: &str = r#"
while read -r line; do
  printf '%s\n' '{"type":"assistant","message":{"content":[{"type":"text","text":"Hello, world"}]},"session_id":"sess-1"}'
  printf '%s\n' '{"type":"result","subtype":"success","session_id":"sess-1"}'
done
"#;

#[tokio::test]
async fn ask_returns_accumulated_response() {
    let fake = fake_cli(HELLO_SCRIPT);
    let mut agent = Agent::new(fake.config);

    agent.connect(ConnectOptions::new()).await.unwrap();
    assert!(agent.is_connected());

    let answer = agent.ask("say hello").await.unwrap();
    assert_eq!(answer.as_deref(), Some("Hello, world"));

    agent.close().await.unwrap();
}

#[tokio::test]
async fn sequential_asks_reuse_the_same_child() {
    let fake = fake_cli(HELLO_SCRIPT);
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    let first = agent.ask("one").await.unwrap();
    let second = agent.ask("two").await.unwrap();
    assert_eq!(first.as_deref(), Some("Hello, world"));
    assert_eq!(second.as_deref(), Some("Hello, world"));

    agent.close().await.unwrap();
}

#[tokio::test]
async fn session_key_is_captured_from_the_stream() {
    let fake = fake_cli(HELLO_SCRIPT);
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();
    assert!(agent.session_key().is_none());

    agent.ask("hello").await.unwrap();
    assert_eq!(agent.session_key(), Some("sess-1"));

    agent.close().await.unwrap();
}

#[tokio::test]
async fn error_frame_fails_the_ask_with_the_carried_message() {
    let fake = fake_cli(
        r#"
read -r line
printf '%s\n' '{"type":"error","message":"boom"}'
# Keep stdin open so the process does not exit before the ask resolves.
sleep 5
"#,
    );
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    match agent.ask("trigger").await {
        Err(AgentError::Terminal(message)) => assert_eq!(message, "boom"),
        other => panic!("expected a terminal error, got {other:?}"),
    }

    agent.close().await.unwrap();
}

#[tokio::test]
async fn stdout_closing_mid_response_is_premature_end_of_stream() {
    let fake = fake_cli(
        r#"
read -r line
printf '%s\n' '{"type":"assistant","message":{"content":"partial"}}'
exit 0
"#,
    );
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    assert!(matches!(
        agent.ask("hello").await,
        Err(AgentError::PrematureEndOfStream)
    ));

    agent.close().await.unwrap();
}

#[tokio::test]
async fn startup_failure_surfaces_the_child_stderr() {
    let fake = fake_cli(
        r#"
echo "bad flags" >&2
exit 7
"#,
    );
    let mut agent = Agent::new(fake.config);

    match agent.connect(ConnectOptions::new()).await {
        Err(AgentError::Connection(message)) => {
            assert!(message.contains("failed to start"), "got: {message}");
            assert!(message.contains("bad flags"), "got: {message}");
        }
        other => panic!("expected a connection error, got {other:?}"),
    }
    assert!(!agent.is_connected());
}

#[tokio::test]
async fn blank_asks_never_reach_the_child() {
    let fake = fake_cli(
        r#"
while read -r line; do
  printf '%s\n' "$line" >> received.log
  printf '%s\n' '{"type":"result"}'
done
"#,
    );
    let sandbox = fake.config.sandbox_dir.clone();
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    assert!(agent.ask("").await.unwrap().is_none());
    assert!(agent.ask("   \n").await.unwrap().is_none());
    assert!(agent.ask("real").await.unwrap().is_some());

    agent.close().await.unwrap();

    // The child runs inside the sandbox, so received.log lands there.
    let received = std::fs::read_to_string(sandbox.join("received.log")).unwrap();
    assert_eq!(received.lines().count(), 1);
}

#[tokio::test]
async fn malformed_lines_and_stderr_noise_are_skipped() {
    let fake = fake_cli(
        r#"
read -r line
echo "warning: something minor" >&2
printf '%s\n' 'this is not json'
printf '%s\n' '{"type":"weird","payload":1}'
printf '%s\n' '{"type":"assistant","message":{"content":"fine"}}'
printf '%s\n' '{"type":"result"}'
sleep 5
"#,
    );
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let registry = CallbackRegistry::new().on_named("types", move |event: &Value| {
        let kind = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        sink.lock().unwrap().push(kind);
        Ok(())
    });

    let mut agent = Agent::with_observers(fake.config, registry);
    agent.connect(ConnectOptions::new()).await.unwrap();

    let answer = agent.ask("go").await.unwrap();
    assert_eq!(answer.as_deref(), Some("fine"));

    // Unrecognized frames still reach observers; malformed lines do not.
    let types = seen.lock().unwrap().clone();
    assert!(types.contains(&"weird".to_string()), "got: {types:?}");
    assert!(types.contains(&"assistant".to_string()), "got: {types:?}");
    assert!(types.contains(&"result".to_string()), "got: {types:?}");

    agent.close().await.unwrap();
}

#[tokio::test]
async fn connect_injects_the_prompt_handshake_for_fresh_sessions() {
    let fake = fake_cli(HELLO_SCRIPT);
    let prompt = "You are a terse assistant.";
    let mut agent = Agent::new(fake.config.with_system_prompt(prompt));
    agent.connect(ConnectOptions::new()).await.unwrap();

    let log = agent.event_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["type"], "system");
    assert_eq!(log[0]["subtype"], "prompt");
    assert_eq!(log[0]["system_prompt"], prompt);
    assert!(log[0]["timestamp"].is_string());

    agent.close().await.unwrap();
}

#[tokio::test]
async fn resumed_sessions_skip_the_prompt_handshake() {
    let fake = fake_cli(HELLO_SCRIPT);
    let mut agent = Agent::new(fake.config);
    agent
        .connect(ConnectOptions::new().with_session_key("sess-9"))
        .await
        .unwrap();

    assert!(agent.event_log().is_empty());
    assert_eq!(agent.session_key(), Some("sess-9"));

    agent.close().await.unwrap();
}

#[tokio::test]
async fn double_connect_is_rejected() {
    let fake = fake_cli(HELLO_SCRIPT);
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    assert!(matches!(
        agent.connect(ConnectOptions::new()).await,
        Err(AgentError::Connection(_))
    ));

    agent.close().await.unwrap();
}

#[tokio::test]
async fn connect_after_close_is_rejected() {
    let fake = fake_cli(HELLO_SCRIPT);
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();
    agent.close().await.unwrap();

    assert!(matches!(
        agent.connect(ConnectOptions::new()).await,
        Err(AgentError::Closed)
    ));
}

#[tokio::test]
async fn child_dying_between_asks_fails_the_next_ask() {
    let fake = fake_cli(
        r#"
read -r line
printf '%s\n' '{"type":"result"}'
echo "giving up" >&2
exit 3
"#,
    );
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    agent.ask("first").await.unwrap();

    // Give the child time to exit before the next send.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    match agent.ask("second").await {
        Err(AgentError::Connection(message)) => {
            assert!(message.contains("died") || message.contains("has died"), "got: {message}");
        }
        other => panic!("expected a connection error, got {other:?}"),
    }

    agent.close().await.unwrap();
}

#[tokio::test]
async fn child_dying_mid_drain_is_a_connection_error() {
    // The backgrounded sleep inherits the pipes, so stdout never reaches
    // EOF; only the liveness check can notice the death.
    let fake = fake_cli(
        r#"
read -r line
sleep 10 &
exit 3
"#,
    );
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    match agent.ask("hello").await {
        Err(AgentError::Connection(message)) => {
            assert!(
                message.contains("died while reading response"),
                "got: {message}"
            );
        }
        other => panic!("expected a connection error, got {other:?}"),
    }

    agent.close().await.unwrap();
}

#[tokio::test]
async fn observer_failure_propagates_to_the_caller() {
    let fake = fake_cli(HELLO_SCRIPT);
    let registry = CallbackRegistry::new().on_named("faulty", |_event: &Value| {
        Err(AgentError::Observer("observer exploded".to_string()))
    });

    let mut agent = Agent::with_observers(fake.config, registry);

    // The handshake injection at connect already dispatches to observers.
    assert!(matches!(
        agent.connect(ConnectOptions::new()).await,
        Err(AgentError::Observer(_))
    ));
}

#[tokio::test]
async fn deltas_are_folded_into_the_response() {
    let fake = fake_cli(
        r#"
read -r line
printf '%s\n' '{"type":"content_block_delta","delta":{"text":"Hel"}}'
printf '%s\n' '{"type":"content_block_delta","delta":{"text":"lo"}}'
printf '%s\n' '{"type":"result"}'
sleep 5
"#,
    );
    let mut agent = Agent::new(fake.config);
    agent.connect(ConnectOptions::new()).await.unwrap();

    let answer = agent.ask("stream it").await.unwrap();
    assert_eq!(answer.as_deref(), Some("Hello"));

    agent.close().await.unwrap();
}
