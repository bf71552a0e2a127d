use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::Timestamp;

/// Identity of a message: a client placeholder, a server UUID, or a numeric row id.
///
/// Identities are compared by their string form, so `Number(7)` and `Text("7")`
/// refer to the same message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl MessageId {
    /// String form used as the key for tool-call lookups.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl PartialEq for MessageId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => self.key() == other.key(),
        }
    }
}

impl Eq for MessageId {}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err("invalid message role"),
        }
    }
}

/// Lifecycle of a message in the timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Assistant content is still arriving.
    Loading,
    /// Optimistically rendered user message, not yet acknowledged.
    Local,
    /// Terminal.
    Done,
}

/// A single turn in the conversation timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    pub status: MessageStatus,
    pub timestamp: Timestamp,
    /// Set while history polling still observes this message growing after
    /// the live stream completed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
}

impl Message {
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        role: MessageRole,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            status,
            timestamp: Timestamp::now(),
            is_streaming: false,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Partial update applied to a message by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub status: Option<MessageStatus>,
    pub is_streaming: Option<bool>,
}

impl MessagePatch {
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn streaming(is_streaming: bool) -> Self {
        Self {
            is_streaming: Some(is_streaming),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether applying the patch would change any field of `message`.
    #[must_use]
    pub fn differs_from(&self, message: &Message) -> bool {
        self.content.as_ref().is_some_and(|c| *c != message.content)
            || self.status.is_some_and(|s| s != message.status)
            || self.is_streaming.is_some_and(|s| s != message.is_streaming)
    }

    pub fn apply_to(&self, message: &mut Message) {
        if let Some(content) = &self.content {
            message.content.clone_from(content);
        }
        if let Some(status) = self.status {
            message.status = status;
        }
        if let Some(is_streaming) = self.is_streaming {
            message.is_streaming = is_streaming;
        }
    }
}
