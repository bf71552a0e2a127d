//! History Reconciliation Poller.
//!
//! Performs one authoritative history load for a conversation, then, when
//! the newest persisted message is recent, keeps polling for a while: the
//! backend may still be saving a streamed reply after the live stream sent
//! `done`. Polling stops after a run of unchanged observations or once the
//! poll budget is spent.

use std::{rc::Rc, time::Duration};

use futures_util::future::{AbortHandle, abortable};
use shared::config::ClientConfig;
use shared::models::{
    Message, MessagePatch, MessageRole, MessageStatus, PersistedMessage, Timestamp,
};
use tracing::{debug, info, warn};

use crate::api::{ChatBackend, ClientError};
use crate::runtime;
use crate::store::{ConversationState, ConversationStore};

/// Timing knobs of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub recency_window: Duration,
    pub quiescence_polls: u32,
    pub max_polls: u32,
}

impl From<&ClientConfig> for PollSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            recency_window: config.recency_window(),
            quiescence_polls: config.quiescence_polls.max(1),
            max_polls: config.max_polls(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

/// Result of one poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Grew,
    Unchanged,
    Quiescent,
}

#[derive(Debug)]
pub struct HistoryPoller<B: ?Sized> {
    store: ConversationStore,
    backend: Rc<B>,
    settings: PollSettings,
    conversation_id: String,
    no_change_polls: u32,
    last_content_length: usize,
    last_message_count: usize,
}

impl<B> HistoryPoller<B>
where
    B: ChatBackend + ?Sized,
{
    pub fn new(
        store: ConversationStore,
        backend: Rc<B>,
        settings: PollSettings,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            settings,
            conversation_id: conversation_id.into(),
            no_change_polls: 0,
            last_content_length: 0,
            last_message_count: 0,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Loads persisted history into the store. Returns whether the newest
    /// message is recent enough to start polling.
    pub async fn load(&mut self) -> bool {
        self.store.set_loading_history(true);
        let records = self.fetch().await;
        let should_poll = match records {
            Some(records) => {
                let recent = records.last().is_some_and(|last| {
                    last.created_at
                        .is_within(self.settings.recency_window, Timestamp::now())
                });
                self.observe(&records);
                self.merge(&records, false);
                info!(
                    conversation_id = %self.conversation_id,
                    count = records.len(),
                    recent,
                    "history loaded"
                );
                recent
            }
            None => {
                if self.store.state().is_request_in_flight {
                    debug!("no history while a request is in flight, keeping local messages");
                } else {
                    self.store.set_messages(Vec::new());
                }
                false
            }
        };
        self.store.set_loading_history(false);
        should_poll
    }

    /// Re-fetches history and merges it when the conversation grew.
    pub async fn poll_once(&mut self) -> PollStep {
        let Some(records) = self.fetch().await else {
            return self.unchanged();
        };
        let Some(newest) = records.last() else {
            return self.unchanged();
        };

        let state = self.store.state();
        let rewritten = state
            .last_message()
            .is_some_and(|current| current.id == newest.id && current.content != newest.content);
        let more_messages = records.len() > self.last_message_count;
        let longer = newest.content.len() > self.last_content_length;
        self.observe(&records);

        if rewritten || more_messages || longer {
            debug!(
                conversation_id = %self.conversation_id,
                rewritten,
                more_messages,
                longer,
                "history grew"
            );
            self.merge(&records, true);
            self.no_change_polls = 0;
            PollStep::Grew
        } else {
            self.unchanged()
        }
    }

    /// Loads history, then polls until quiescence or until the poll budget
    /// runs out.
    pub async fn run(mut self) {
        if !self.load().await {
            return;
        }
        for _ in 0..self.settings.max_polls {
            runtime::sleep(self.settings.interval).await;
            if self.poll_once().await == PollStep::Quiescent {
                info!(conversation_id = %self.conversation_id, "history settled");
                self.settle();
                return;
            }
        }
        debug!(conversation_id = %self.conversation_id, "poll window exhausted");
        self.settle();
    }

    async fn fetch(&self) -> Option<Vec<PersistedMessage>> {
        match self.backend.fetch_history(&self.conversation_id).await {
            Ok(history) if history.messages.is_empty() => None,
            Ok(history) => Some(history.messages),
            Err(ClientError::NotFound) => {
                debug!(conversation_id = %self.conversation_id, "conversation has no history");
                None
            }
            Err(err) => {
                warn!(conversation_id = %self.conversation_id, error = %err, "history fetch failed");
                None
            }
        }
    }

    fn observe(&mut self, records: &[PersistedMessage]) {
        self.last_message_count = records.len();
        self.last_content_length = records.last().map_or(0, |last| last.content.len());
    }

    fn unchanged(&mut self) -> PollStep {
        self.no_change_polls += 1;
        if self.no_change_polls >= self.settings.quiescence_polls {
            PollStep::Quiescent
        } else {
            PollStep::Unchanged
        }
    }

    /// Replaces the store's messages with `records`, keeping the optimistic
    /// messages of an in-flight request that the backend has not saved yet.
    fn merge(&self, records: &[PersistedMessage], growing: bool) {
        if self.store.state().is_request_in_flight {
            self.adopt_saved_reply(records);
        }
        let state = self.store.state();
        let live = live_reply(&state);
        let mut messages: Vec<Message> = records
            .iter()
            .map(|record| {
                if let Some(live) = live
                    && live.id == record.id
                {
                    return live.clone();
                }
                let mut message = record.to_message();
                message.is_streaming = state
                    .message(&message.id)
                    .is_some_and(|existing| existing.is_streaming);
                message
            })
            .collect();
        if growing
            && let Some(last) = messages.last_mut()
            && last.role == MessageRole::Assistant
        {
            last.is_streaming = true;
        }

        if state.is_request_in_flight {
            let local = state.messages.iter().filter(|message| {
                matches!(message.status, MessageStatus::Local | MessageStatus::Loading)
                    && !records.iter().any(|record| {
                        record.id == message.id
                            || (message.status == MessageStatus::Local
                                && record.role == MessageRole::User
                                && record.content == message.content)
                    })
            });
            messages.extend(local.cloned());
        }

        self.store.set_messages(messages);
        for record in records {
            if live.is_some_and(|live| live.id == record.id) {
                continue;
            }
            let calls = record.to_tool_calls();
            if !calls.is_empty() {
                self.store.set_tool_calls(&record.id, calls);
            }
        }
    }

    /// The backend saves a reply while it streams. The newest saved assistant
    /// record the store has not seen yet is that reply, so it takes over the
    /// loading placeholder instead of appearing next to it.
    fn adopt_saved_reply(&self, records: &[PersistedMessage]) {
        let state = self.store.state();
        let Some(pending) = live_reply(&state) else {
            return;
        };
        if records.iter().any(|record| record.id == pending.id) {
            return;
        }
        let Some(saved) = records
            .iter()
            .rev()
            .find(|record| record.role == MessageRole::Assistant)
        else {
            return;
        };
        if state.contains(&saved.id) {
            return;
        }
        debug!(from = %pending.id, to = %saved.id, "saved reply adopted the placeholder");
        let replacement = Message {
            id: saved.id.clone(),
            ..pending.clone()
        };
        self.store.replace_message(&pending.id, replacement);
    }

    /// Clears every `is_streaming` marker.
    fn settle(&self) {
        let streaming: Vec<_> = self
            .store
            .state()
            .messages
            .iter()
            .filter(|message| message.is_streaming)
            .map(|message| message.id.clone())
            .collect();
        for id in streaming {
            self.store.update_message(&id, &MessagePatch::streaming(false));
        }
    }
}

/// The assistant message an in-flight request is still streaming into.
fn live_reply(state: &ConversationState) -> Option<&Message> {
    if !state.is_request_in_flight {
        return None;
    }
    state
        .pending_message_id
        .as_ref()
        .and_then(|id| state.message(id))
        .filter(|message| message.status == MessageStatus::Loading)
}

impl<B> HistoryPoller<B>
where
    B: ChatBackend + ?Sized + 'static,
{
    /// Runs the poller on the local executor; dropping the handle stops it.
    pub fn spawn(self) -> PollerHandle {
        let (task, abort) = abortable(self.run());
        runtime::spawn_local(async move {
            if task.await.is_err() {
                debug!("history poller stopped");
            }
        });
        PollerHandle { abort }
    }
}

/// Owner of a spawned poll loop. No poll fires after [`PollerHandle::stop`]
/// or after the handle is dropped.
#[derive(Debug)]
pub struct PollerHandle {
    abort: AbortHandle,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.abort.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.is_aborted()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.abort.abort();
    }
}
