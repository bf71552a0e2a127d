use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Timestamp;

/// One tool invocation attributed to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub input: Value,
    /// `None` while the tool is still running.
    #[serde(default)]
    pub result: Option<String>,
    pub issued_at: Timestamp,
}

impl ToolCall {
    /// A running call whose identity is derived from the tool name, issuance
    /// time and a per-request sequence number.
    #[must_use]
    pub fn started(tool_name: &str, input: Value, issued_at: Timestamp, sequence: u32) -> Self {
        Self {
            id: format!("{tool_name}-{}-{sequence}", issued_at.millis()),
            tool_name: tool_name.to_string(),
            input,
            result: None,
            issued_at,
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.result.is_none()
    }
}
