//! Folds a frame sequence into a single textual response

use agentpipe_protocol::{AssistantContent, ContentBlock, EventFrame, FrameKind};

/// Outcome of absorbing one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Fold {
    /// Keep draining the stream
    Continue,

    /// Terminal `result` frame arrived: the response is complete
    Complete,

    /// Terminal `error` frame arrived, carrying the remote message
    Terminated(String),
}

/// Accumulator for one ask's response text
///
/// Grows by string concatenation only, and only for assistant text and delta
/// text. A fresh buffer is used for every ask, so accumulation is a pure
/// function of the frame sequence.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    text: String,
}

impl ResponseBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame into the buffer and classify it
    pub fn absorb(&mut self, frame: &EventFrame) -> Fold {
        match frame.kind() {
            FrameKind::Assistant { content } => {
                match content {
                    AssistantContent::Text(text) => self.text.push_str(text),
                    AssistantContent::Blocks(blocks) => {
                        for block in blocks {
                            if let ContentBlock::Text { text } = block {
                                self.text.push_str(text);
                            }
                        }
                    }
                }
                Fold::Continue
            }
            FrameKind::Delta { text } => {
                if !text.is_empty() {
                    // Incremental fragments are surfaced for live display;
                    // that is presentation, not protocol.
                    tracing::debug!(fragment = %text, "streamed delta");
                    self.text.push_str(text);
                }
                Fold::Continue
            }
            FrameKind::Result => Fold::Complete,
            FrameKind::Error { message } => Fold::Terminated(message.clone()),
            FrameKind::System | FrameKind::Unknown { .. } => Fold::Continue,
        }
    }

    /// The text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Consume the buffer, yielding the final response
    pub fn into_text(self) -> String {
        self.text
    }
}
