//! Streaming Request Coordinator: owns the lifecycle of one chat request.
//!
//! A submission appends the user's message and an assistant placeholder,
//! sends the request, then applies each decoded [`StreamEvent`] to the
//! placeholder in arrival order. Whatever ends the request (`done`, `error`,
//! a transport failure or a truncated body), the placeholder leaves the
//! `loading` state and the in-flight flag is cleared.

use std::{fmt, rc::Rc};

use futures_util::{StreamExt, pin_mut};
use serde_json::Value;
use shared::models::{
    ChatRequest, Message, MessageId, MessagePatch, MessageRole, MessageStatus, StreamEvent,
    Timestamp, ToolCall,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::{ChatBackend, ClientError, ClientResult};
use crate::decoder::decode_events;
use crate::identity::{ConversationIdStore, get_conversation_id};
use crate::store::ConversationStore;

pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred while processing your message.";

/// How a call to [`StreamingCoordinator::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The stream finished; `content` is the final assistant text.
    Completed { content: String },
    /// The request failed; partial content stays on the assistant message.
    Failed { message: String },
    /// Another request was already in flight; nothing was sent.
    Busy,
}

enum StreamEnd {
    Done,
    Failed(String),
}

/// Client-side identity of the form `<prefix>-<millis>-<random>`.
pub fn placeholder_id(prefix: &str, at: Timestamp) -> MessageId {
    let random = Uuid::new_v4().simple().to_string();
    MessageId::from(format!("{prefix}-{}-{}", at.millis(), &random[..9]))
}

/// Called with every decoded event before it is applied.
pub type EventObserver = Box<dyn FnMut(&StreamEvent)>;

pub struct StreamingCoordinator<B: ?Sized, S: ?Sized> {
    store: ConversationStore,
    backend: Rc<B>,
    ids: Rc<S>,
    observer: Option<EventObserver>,
    running_content: String,
    has_received_content: bool,
    tool_sequence: u32,
}

impl<B: ?Sized, S: ?Sized> fmt::Debug for StreamingCoordinator<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingCoordinator")
            .field("store", &self.store)
            .field("running_content", &self.running_content)
            .field("has_received_content", &self.has_received_content)
            .field("tool_sequence", &self.tool_sequence)
            .finish_non_exhaustive()
    }
}

impl<B, S> StreamingCoordinator<B, S>
where
    B: ChatBackend + ?Sized,
    S: ConversationIdStore + ?Sized,
{
    pub fn new(store: ConversationStore, backend: Rc<B>, ids: Rc<S>) -> Self {
        Self {
            store,
            backend,
            ids,
            observer: None,
            running_content: String::new(),
            has_received_content: false,
            tool_sequence: 0,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&StreamEvent) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Sends `text` and streams the reply into the store.
    ///
    /// Exactly one request is issued unless another is already in flight, in
    /// which case [`SubmitOutcome::Busy`] is returned and the store is left
    /// untouched.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if self.store.state().is_request_in_flight {
            warn!("request already in flight, ignoring submission");
            return SubmitOutcome::Busy;
        }
        self.store.set_request_in_flight(true);
        self.running_content.clear();
        self.has_received_content = false;
        self.tool_sequence = 0;

        let conversation_id = self.resolve_conversation_id();
        let now = Timestamp::now();
        let user_id = placeholder_id("user", now);
        let assistant_id = placeholder_id("assistant", now);
        self.store.add_message(
            Message::new(user_id.clone(), MessageRole::User, text, MessageStatus::Local)
                .with_timestamp(now),
        );
        self.store.add_message(
            Message::new(
                assistant_id.clone(),
                MessageRole::Assistant,
                "",
                MessageStatus::Loading,
            )
            .with_timestamp(now),
        );
        self.store.set_pending_message(Some(assistant_id));
        info!(conversation_id = %conversation_id, "submitting message");

        let request = ChatRequest {
            message: text.to_string(),
            conversation_id: Some(conversation_id),
        };
        let end = match self.stream(&request).await {
            Ok(end) => end,
            Err(err) => {
                error!(error = %err, "chat request failed");
                StreamEnd::Failed(err.to_string())
            }
        };
        self.finish(&user_id, end)
    }

    fn resolve_conversation_id(&self) -> String {
        if let Some(id) = self.store.conversation_id() {
            return id;
        }
        let id = get_conversation_id(&*self.ids);
        self.store.set_conversation_id(Some(id.clone()));
        id
    }

    async fn stream(&mut self, request: &ChatRequest) -> ClientResult<StreamEnd> {
        let body = self.backend.send_message(request).await?;
        let events = decode_events(body);
        pin_mut!(events);

        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(observer) = self.observer.as_mut() {
                observer(&event);
            }
            if let Some(end) = self.apply(event) {
                return Ok(end);
            }
        }

        if self.has_received_content {
            warn!("stream ended without a terminal event");
            Ok(StreamEnd::Done)
        } else {
            Err(ClientError::stream("stream ended unexpectedly"))
        }
    }

    fn apply(&mut self, event: StreamEvent) -> Option<StreamEnd> {
        match event {
            StreamEvent::ConversationId {
                conversation_id: Some(id),
            } => self.sync_conversation_id(id),
            StreamEvent::ConversationId {
                conversation_id: None,
            } => {}
            StreamEvent::ContentDelta { content } => {
                self.running_content.push_str(&content);
                self.publish_content();
            }
            StreamEvent::Content { content } => {
                self.running_content = content;
                self.publish_content();
            }
            StreamEvent::ToolCall { tool, input } => self.start_tool_call(&tool, input),
            StreamEvent::ToolResult { tool, result } => self.finish_tool_call(&tool, result),
            StreamEvent::Done => return Some(StreamEnd::Done),
            StreamEvent::Error { message } => {
                let message = message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
                warn!(%message, "stream reported an error");
                return Some(StreamEnd::Failed(message));
            }
            StreamEvent::Unrecognized => debug!("ignoring unrecognized stream event"),
        }
        None
    }

    fn sync_conversation_id(&self, id: String) {
        if self.store.conversation_id().as_deref() == Some(id.as_str()) {
            return;
        }
        info!(conversation_id = %id, "server assigned conversation identity");
        self.ids.set(&id);
        self.store.set_conversation_id(Some(id));
    }

    fn publish_content(&mut self) {
        self.has_received_content = true;
        if let Some(id) = self.store.pending_message_id() {
            self.store
                .update_message(&id, &MessagePatch::content(self.running_content.clone()));
        }
    }

    fn start_tool_call(&mut self, tool: &str, input: Value) {
        let Some(id) = self.store.pending_message_id() else {
            warn!(tool, "tool call without a pending message");
            return;
        };
        let call = ToolCall::started(tool, input, Timestamp::now(), self.tool_sequence);
        self.tool_sequence += 1;
        debug!(tool, call_id = %call.id, message_id = %id, "tool call started");
        self.store.add_tool_call(&id, call);
    }

    fn finish_tool_call(&self, tool: &str, result: String) {
        let Some(id) = self.store.pending_message_id() else {
            return;
        };
        let matched = self
            .store
            .state()
            .tool_calls_for(&id)
            .iter()
            .any(|call| call.tool_name == tool && call.is_running());
        if matched {
            debug!(tool, message_id = %id, "tool call finished");
            self.store.resolve_tool_call(&id, tool, result);
        } else {
            debug!(tool, "dropping tool result without a running call");
        }
    }

    fn finish(&mut self, user_id: &MessageId, end: StreamEnd) -> SubmitOutcome {
        let pending = self.store.pending_message_id();
        let outcome = match end {
            StreamEnd::Done => {
                if let Some(id) = &pending {
                    self.store.update_message(
                        id,
                        &MessagePatch::content(self.running_content.clone())
                            .with_status(MessageStatus::Done),
                    );
                }
                self.store
                    .update_message(user_id, &MessagePatch::status(MessageStatus::Done));
                info!(length = self.running_content.len(), "request completed");
                SubmitOutcome::Completed {
                    content: std::mem::take(&mut self.running_content),
                }
            }
            StreamEnd::Failed(message) => {
                if let Some(id) = &pending {
                    self.store
                        .update_message(id, &MessagePatch::status(MessageStatus::Done));
                }
                SubmitOutcome::Failed { message }
            }
        };
        self.store.set_pending_message(None);
        self.store.set_request_in_flight(false);
        outcome
    }
}
