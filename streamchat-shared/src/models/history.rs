use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, MessageId, MessageRole, MessageStatus, Timestamp, ToolCall};

/// Response of `GET /conversations/{id}/history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<PersistedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedMessage {
    pub id: MessageId,
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub tool_calls: Option<Vec<PersistedToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedToolCall {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub tool_name: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl PersistedMessage {
    /// Maps the record into a finished timeline message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message {
            id: self.id.clone(),
            role: self.role,
            content: self.content.clone(),
            status: MessageStatus::Done,
            timestamp: self.created_at,
            is_streaming: false,
        }
    }

    #[must_use]
    pub fn to_tool_calls(&self) -> Vec<ToolCall> {
        self.tool_calls
            .iter()
            .flatten()
            .enumerate()
            .map(|(index, call)| {
                let issued_at = call.created_at.unwrap_or(self.created_at);
                ToolCall {
                    id: call.id.as_ref().map_or_else(
                        || format!("{}-{}-{index}", call.tool_name, issued_at.millis()),
                        MessageId::key,
                    ),
                    tool_name: call.tool_name.clone(),
                    input: call.input.clone(),
                    result: call.result.clone(),
                    issued_at,
                }
            })
            .collect()
    }
}
