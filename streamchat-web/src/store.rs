//! Conversation Store: the single source of truth shared by the streaming
//! coordinator, the history poller and the identity resolver.
//!
//! Every mutation is a reducer from the current `Rc<ConversationState>` to
//! the next one. Reducers never fail: a missing target or a change that would
//! not alter anything hands back the same `Rc`, so subscribers are not
//! notified for no-ops.

use std::{collections::HashMap, fmt, rc::Rc};

use shared::models::{Message, MessageId, MessagePatch, ToolCall};
use tracing::trace;
use yewdux::{Context, Dispatch, Store};

#[derive(Debug, Default, Clone, PartialEq, Store)]
pub struct ConversationState {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    /// Tool calls keyed by the string form of the owning message identity.
    pub tool_calls: HashMap<String, Vec<ToolCall>>,
    /// Assistant message the in-flight request is writing into.
    pub pending_message_id: Option<MessageId>,
    pub suggestions: Vec<String>,
    pub is_loading_history: bool,
    pub is_request_in_flight: bool,
}

impl ConversationState {
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == *id)
    }

    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.message(id).is_some()
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool calls attached to `id`; empty when there are none.
    #[must_use]
    pub fn tool_calls_for(&self, id: &MessageId) -> &[ToolCall] {
        self.tool_calls
            .get(&id.key())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn modify(self: Rc<Self>, change: impl FnOnce(&mut Self)) -> Rc<Self> {
        let mut next = (*self).clone();
        change(&mut next);
        Rc::new(next)
    }

    #[must_use]
    pub fn set_conversation_id(self: Rc<Self>, id: Option<String>) -> Rc<Self> {
        if self.conversation_id == id {
            return self;
        }
        self.modify(|state| state.conversation_id = id)
    }

    /// Appends `message` unless a message with the same identity exists.
    #[must_use]
    pub fn add_message(self: Rc<Self>, message: Message) -> Rc<Self> {
        if self.contains(&message.id) {
            trace!(id = %message.id, "message already present");
            return self;
        }
        self.modify(|state| state.messages.push(message))
    }

    #[must_use]
    pub fn update_message(self: Rc<Self>, id: &MessageId, patch: &MessagePatch) -> Rc<Self> {
        let Some(index) = self.messages.iter().position(|message| message.id == *id) else {
            return self;
        };
        if !patch.differs_from(&self.messages[index]) {
            return self;
        }
        self.modify(|state| patch.apply_to(&mut state.messages[index]))
    }

    #[must_use]
    pub fn set_messages(self: Rc<Self>, messages: Vec<Message>) -> Rc<Self> {
        if self.messages == messages {
            return self;
        }
        self.modify(|state| state.messages = messages)
    }

    /// Appends `call` to the tool calls of a message in the list.
    #[must_use]
    pub fn add_tool_call(self: Rc<Self>, message_id: &MessageId, call: ToolCall) -> Rc<Self> {
        if !self.contains(message_id) {
            trace!(id = %message_id, "tool call for unknown message");
            return self;
        }
        self.modify(|state| {
            state
                .tool_calls
                .entry(message_id.key())
                .or_default()
                .push(call);
        })
    }

    /// Attaches `result` to the oldest running call of `tool_name` on the message.
    #[must_use]
    pub fn resolve_tool_call(
        self: Rc<Self>,
        message_id: &MessageId,
        tool_name: &str,
        result: String,
    ) -> Rc<Self> {
        let key = message_id.key();
        let Some(index) = self.tool_calls.get(&key).and_then(|calls| {
            calls
                .iter()
                .position(|call| call.tool_name == tool_name && call.is_running())
        }) else {
            return self;
        };
        self.modify(|state| {
            if let Some(calls) = state.tool_calls.get_mut(&key) {
                calls[index].result = Some(result);
            }
        })
    }

    /// Replaces the tool-call list of a message; an empty list removes the key.
    #[must_use]
    pub fn set_tool_calls(
        self: Rc<Self>,
        message_id: &MessageId,
        calls: Vec<ToolCall>,
    ) -> Rc<Self> {
        let key = message_id.key();
        let unchanged = self
            .tool_calls
            .get(&key)
            .map_or(calls.is_empty(), |current| *current == calls);
        if unchanged {
            return self;
        }
        self.modify(|state| {
            if calls.is_empty() {
                state.tool_calls.remove(&key);
            } else {
                state.tool_calls.insert(key, calls);
            }
        })
    }

    /// Swaps a placeholder message for `replacement` in place and moves the
    /// placeholder's tool calls to the replacement's key.
    #[must_use]
    pub fn replace_message(self: Rc<Self>, old_id: &MessageId, replacement: Message) -> Rc<Self> {
        let Some(index) = self.messages.iter().position(|message| message.id == *old_id) else {
            return self;
        };
        self.modify(|state| {
            let old_key = old_id.key();
            let new_key = replacement.id.key();
            if let Some(calls) = state.tool_calls.remove(&old_key) {
                state.tool_calls.entry(new_key).or_default().extend(calls);
            }
            if state.pending_message_id.as_ref() == Some(old_id) {
                state.pending_message_id = Some(replacement.id.clone());
            }
            state.messages[index] = replacement;
        })
    }

    #[must_use]
    pub fn set_pending_message(self: Rc<Self>, id: Option<MessageId>) -> Rc<Self> {
        if self.pending_message_id == id {
            return self;
        }
        self.modify(|state| state.pending_message_id = id)
    }

    #[must_use]
    pub fn set_suggestions(self: Rc<Self>, suggestions: Vec<String>) -> Rc<Self> {
        if self.suggestions == suggestions {
            return self;
        }
        self.modify(|state| state.suggestions = suggestions)
    }

    #[must_use]
    pub fn set_loading_history(self: Rc<Self>, value: bool) -> Rc<Self> {
        if self.is_loading_history == value {
            return self;
        }
        self.modify(|state| state.is_loading_history = value)
    }

    #[must_use]
    pub fn set_request_in_flight(self: Rc<Self>, value: bool) -> Rc<Self> {
        if self.is_request_in_flight == value {
            return self;
        }
        self.modify(|state| state.is_request_in_flight = value)
    }

    #[must_use]
    pub fn clear(self: Rc<Self>) -> Rc<Self> {
        if *self == Self::default() {
            return self;
        }
        Rc::new(Self::default())
    }
}

/// Handle to the conversation state held in a yewdux [`Context`].
///
/// Clones share the same state; every method is one atomic reducer.
#[derive(Clone)]
pub struct ConversationStore {
    dispatch: Dispatch<ConversationState>,
}

impl fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationStore")
            .field("state", &self.dispatch.get())
            .finish()
    }
}

impl ConversationStore {
    pub fn new(cx: &Context) -> Self {
        Self {
            dispatch: Dispatch::new(cx),
        }
    }

    /// A store in a fresh, private context.
    pub fn detached() -> Self {
        Self::new(&Context::new())
    }

    pub fn dispatch(&self) -> &Dispatch<ConversationState> {
        &self.dispatch
    }

    pub fn state(&self) -> Rc<ConversationState> {
        self.dispatch.get()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state().conversation_id.clone()
    }

    pub fn pending_message_id(&self) -> Option<MessageId> {
        self.state().pending_message_id.clone()
    }

    pub fn set_conversation_id(&self, id: Option<String>) {
        self.dispatch.reduce(|state| state.set_conversation_id(id));
    }

    pub fn add_message(&self, message: Message) {
        self.dispatch.reduce(|state| state.add_message(message));
    }

    pub fn update_message(&self, id: &MessageId, patch: &MessagePatch) {
        self.dispatch.reduce(|state| state.update_message(id, patch));
    }

    pub fn set_messages(&self, messages: Vec<Message>) {
        self.dispatch.reduce(|state| state.set_messages(messages));
    }

    pub fn add_tool_call(&self, message_id: &MessageId, call: ToolCall) {
        self.dispatch
            .reduce(|state| state.add_tool_call(message_id, call));
    }

    pub fn resolve_tool_call(&self, message_id: &MessageId, tool_name: &str, result: String) {
        self.dispatch
            .reduce(|state| state.resolve_tool_call(message_id, tool_name, result));
    }

    pub fn set_tool_calls(&self, message_id: &MessageId, calls: Vec<ToolCall>) {
        self.dispatch
            .reduce(|state| state.set_tool_calls(message_id, calls));
    }

    pub fn replace_message(&self, old_id: &MessageId, replacement: Message) {
        self.dispatch
            .reduce(|state| state.replace_message(old_id, replacement));
    }

    pub fn set_pending_message(&self, id: Option<MessageId>) {
        self.dispatch.reduce(|state| state.set_pending_message(id));
    }

    pub fn set_suggestions(&self, suggestions: Vec<String>) {
        self.dispatch
            .reduce(|state| state.set_suggestions(suggestions));
    }

    pub fn set_loading_history(&self, value: bool) {
        self.dispatch.reduce(|state| state.set_loading_history(value));
    }

    pub fn set_request_in_flight(&self, value: bool) {
        self.dispatch
            .reduce(|state| state.set_request_in_flight(value));
    }

    pub fn clear(&self) {
        self.dispatch.reduce(ConversationState::clear);
    }
}
