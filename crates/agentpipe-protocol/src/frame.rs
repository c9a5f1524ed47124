//! Event-frame codec for the child's stdout stream
//!
//! Each stdout line is one JSON frame. The codec classifies frames by their
//! top-level `type` field and extracts the payload each kind carries. Frame
//! types it does not recognize are kept as [`FrameKind::Unknown`] together
//! with the raw payload, so observers can still inspect them even though the
//! response accumulator ignores them.

use serde_json::Value;

/// Errors produced while decoding a single stream line
///
/// These are recoverable: the caller is expected to log the bad line and
/// keep reading. A parse failure never ends the stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameParseError {
    /// Line is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Line is valid JSON but not an object
    #[error("frame is not a JSON object")]
    NotAnObject,
}

/// One decoded protocol message from the child's output stream
///
/// Immutable once parsed. The full decoded payload is retained alongside the
/// classified kind so observers receive the raw event, not just the fields
/// the accumulator cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    kind: FrameKind,
    raw: Value,
}

impl EventFrame {
    /// Classified frame kind and its extracted payload
    pub fn kind(&self) -> &FrameKind {
        &self.kind
    }

    /// The full decoded JSON payload
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Whether this frame ends the current request/response cycle
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, FrameKind::Result | FrameKind::Error { .. })
    }

    /// The `session_id` carried by this frame, if any
    pub fn session_id(&self) -> Option<&str> {
        self.raw.get("session_id").and_then(Value::as_str)
    }
}

/// Tagged frame classification
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// Handshake and side-channel info; never folded into the response
    System,

    /// A full or partial assistant message
    Assistant {
        /// Message content, either a bare string or an array of blocks
        content: AssistantContent,
    },

    /// Incremental text fragment
    Delta {
        /// The `delta.text` payload; empty when the delta carries no text
        text: String,
    },

    /// Terminal frame: the current request completed
    Result,

    /// Terminal frame: the remote side reported a failure
    Error {
        /// The carried error message; empty when the frame omits one
        message: String,
    },

    /// Unrecognized frame type, forwarded to observers untouched
    Unknown {
        /// The frame's `type` value, or `None` when the field is absent
        kind: Option<String>,
    },
}

/// Content of an `assistant` frame
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantContent {
    /// Scalar string content
    Text(String),

    /// Array-of-blocks content
    Blocks(Vec<ContentBlock>),
}

/// One block within array-form assistant content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// A text block; the only kind folded into the response
    Text {
        /// The block's text
        text: String,
    },

    /// Any other block kind (tool use, thinking, ...), carried but not folded
    Other {
        /// The block's `type` value
        block_type: String,
    },
}

/// Parse one newline-stripped stdout line into a frame
///
/// Empty and whitespace-only lines yield `Ok(None)`. Malformed lines yield
/// a [`FrameParseError`] the caller should log and skip. Pure: no I/O, no
/// diagnostics of its own.
pub fn parse_line(line: &str) -> Result<Option<EventFrame>, FrameParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: Value = serde_json::from_str(line)?;
    if !raw.is_object() {
        return Err(FrameParseError::NotAnObject);
    }

    let kind = classify(&raw);
    Ok(Some(EventFrame { kind, raw }))
}

fn classify(raw: &Value) -> FrameKind {
    match raw.get("type").and_then(Value::as_str) {
        Some("system") => FrameKind::System,
        Some("assistant") => FrameKind::Assistant {
            content: assistant_content(raw),
        },
        Some("content_block_delta") => FrameKind::Delta {
            text: raw
                .pointer("/delta/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        Some("result") => FrameKind::Result,
        Some("error") => FrameKind::Error {
            message: raw
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        other => FrameKind::Unknown {
            kind: other.map(str::to_string),
        },
    }
}

fn assistant_content(raw: &Value) -> AssistantContent {
    match raw.pointer("/message/content") {
        Some(Value::String(text)) => AssistantContent::Text(text.clone()),
        Some(Value::Array(blocks)) => {
            AssistantContent::Blocks(blocks.iter().map(content_block).collect())
        }
        // Frames without content contribute nothing to the response
        _ => AssistantContent::Blocks(Vec::new()),
    }
}

fn content_block(block: &Value) -> ContentBlock {
    match block.get("type").and_then(Value::as_str) {
        Some("text") => ContentBlock::Text {
            text: block
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        other => ContentBlock::Other {
            block_type: other.unwrap_or_default().to_string(),
        },
    }
}
