//! Scripted [`ChatBackend`] for exercising the core without a server.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use reqwest::StatusCode;
use shared::models::{
    ChatRequest, HistoryResponse, MessageId, MessageRole, PersistedMessage, PersistedToolCall,
    SuggestionsResponse, Timestamp,
};

use crate::api::{ByteStream, ChatBackend, ClientError, ClientResult};

/// Chunks of one scripted response body.
pub type Body = Vec<ClientResult<Vec<u8>>>;

#[derive(Debug, Default)]
pub struct MockBackend {
    bodies: RefCell<VecDeque<Body>>,
    histories: RefCell<VecDeque<Option<HistoryResponse>>>,
    suggestions: RefCell<Vec<String>>,
    pub fail_suggestions: Cell<bool>,
    pub fail_delete: Cell<bool>,
    pub requests: RefCell<Vec<ChatRequest>>,
    pub deleted: RefCell<Vec<String>>,
    pub history_calls: Cell<usize>,
    pub suggestion_calls: Cell<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response body made of one `data:` line per event.
    pub fn push_events(&self, events: &[&str]) {
        let body = events
            .iter()
            .map(|event| Ok(format!("data: {event}\n\n").into_bytes()))
            .collect();
        self.push_body(body);
    }

    pub fn push_body(&self, body: Body) {
        self.bodies.borrow_mut().push_back(body);
    }

    /// Queues a history snapshot; `None` answers with not-found. The last
    /// queued snapshot keeps being served once the queue drains to it.
    pub fn push_history(&self, history: Option<Vec<PersistedMessage>>) {
        self.histories
            .borrow_mut()
            .push_back(history.map(|messages| HistoryResponse { messages }));
    }

    pub fn set_suggestions(&self, suggestions: &[&str]) {
        *self.suggestions.borrow_mut() = suggestions.iter().map(ToString::to_string).collect();
    }
}

#[async_trait(?Send)]
impl ChatBackend for MockBackend {
    async fn send_message(&self, request: &ChatRequest) -> ClientResult<ByteStream> {
        self.requests.borrow_mut().push(request.clone());
        let body = self
            .bodies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ClientError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: "Agent not initialized".into(),
            })?;
        Ok(stream::iter(body).boxed_local())
    }

    async fn fetch_history(&self, _conversation_id: &str) -> ClientResult<HistoryResponse> {
        self.history_calls.set(self.history_calls.get() + 1);
        let mut histories = self.histories.borrow_mut();
        let next = if histories.len() > 1 {
            histories.pop_front()
        } else {
            histories.front().cloned()
        };
        next.flatten().ok_or(ClientError::NotFound)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> ClientResult<()> {
        self.deleted.borrow_mut().push(conversation_id.to_string());
        if self.fail_delete.get() {
            return Err(ClientError::stream("connection refused"));
        }
        Ok(())
    }

    async fn fetch_suggestions(&self, _conversation_id: &str) -> ClientResult<SuggestionsResponse> {
        self.suggestion_calls.set(self.suggestion_calls.get() + 1);
        if self.fail_suggestions.get() {
            return Err(ClientError::NotFound);
        }
        Ok(SuggestionsResponse {
            suggestions: self.suggestions.borrow().clone(),
        })
    }
}

pub fn persisted(id: i64, role: MessageRole, content: &str, created_at: Timestamp) -> PersistedMessage {
    PersistedMessage {
        id: MessageId::from(id),
        role,
        content: content.to_string(),
        created_at,
        tool_calls: None,
    }
}

pub fn persisted_call(tool_name: &str, result: Option<&str>) -> PersistedToolCall {
    PersistedToolCall {
        id: None,
        tool_name: tool_name.to_string(),
        input: serde_json::json!({ "query": "battery" }),
        result: result.map(ToString::to_string),
        created_at: None,
    }
}
