//! Outbound wire format: messages written to the child's stdin

use serde::Serialize;

/// One user turn, serialized as a single stdin line
///
/// Wire shape:
/// `{"type":"user","message":{"role":"user","content":"..."},"session_id":"..."}`
/// with `session_id` omitted entirely when the session has no key yet.
#[derive(Debug, Clone, Serialize)]
pub struct UserTurn {
    #[serde(rename = "type")]
    message_type: &'static str,
    message: TurnBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct TurnBody {
    role: &'static str,
    content: String,
}

impl UserTurn {
    /// Build a turn carrying the given message text
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message_type: "user",
            message: TurnBody {
                role: "user",
                content: content.into(),
            },
            session_id: None,
        }
    }

    /// Attach the resumable session key
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// The message text this turn carries
    pub fn content(&self) -> &str {
        &self.message.content
    }
}
