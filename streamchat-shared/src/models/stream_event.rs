use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event of the chat stream, carried as `data: {json}` lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Backend-assigned or confirmed conversation identity.
    ConversationId {
        #[serde(default)]
        conversation_id: Option<String>,
    },
    /// Incremental text to append.
    ContentDelta {
        #[serde(default)]
        content: String,
    },
    /// Full snapshot replacing the accumulated text.
    Content {
        #[serde(default)]
        content: String,
    },
    ToolCall {
        tool: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool: String,
        #[serde(default)]
        result: String,
    },
    Done,
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any `type` this client does not understand.
    #[serde(other)]
    Unrecognized,
}

impl StreamEvent {
    /// Wire name of the event, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConversationId { .. } => "conversation_id",
            Self::ContentDelta { .. } => "content_delta",
            Self::Content { .. } => "content",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done => "done",
            Self::Error { .. } => "error",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Whether the event ends the request.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
