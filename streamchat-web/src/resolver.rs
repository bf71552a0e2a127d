//! Message Identity Resolver.
//!
//! Mirrors an externally managed message list (a chat-session abstraction
//! that assigns its own identities) into the store. The first unseen
//! assistant entry observed while a placeholder is still loading takes over
//! that placeholder, tool calls included.

use std::collections::HashSet;

use shared::models::{Message, MessageId, MessagePatch, MessageRole, MessageStatus};
use tracing::debug;

use crate::store::ConversationStore;

/// One entry of the external message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalMessage {
    pub id: MessageId,
    pub content: String,
    /// `Local` marks a user-authored message.
    pub status: MessageStatus,
}

impl ExternalMessage {
    pub fn new(id: impl Into<MessageId>, content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status,
        }
    }

    #[must_use]
    pub fn role(&self) -> MessageRole {
        if self.status == MessageStatus::Local {
            MessageRole::User
        } else {
            MessageRole::Assistant
        }
    }
}

/// Counts of what one reconciliation pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub inserted: usize,
    pub replaced: usize,
    pub updated: usize,
}

#[derive(Debug, Clone)]
pub struct MessageResolver {
    store: ConversationStore,
}

impl MessageResolver {
    pub fn new(store: ConversationStore) -> Self {
        Self { store }
    }

    /// Applies one observation of the external list. Duplicate identities
    /// within `external` are processed once.
    pub fn reconcile(&self, external: &[ExternalMessage]) -> Reconciled {
        let mut seen = HashSet::new();
        let mut summary = Reconciled::default();

        for message in external {
            if !seen.insert(message.id.key()) {
                continue;
            }
            let state = self.store.state();

            if let Some(existing) = state.message(&message.id) {
                let patch =
                    MessagePatch::content(message.content.clone()).with_status(message.status);
                if patch.differs_from(existing) {
                    self.store.update_message(&message.id, &patch);
                    summary.updated += 1;
                }
                continue;
            }

            let placeholder = state
                .pending_message_id
                .as_ref()
                .and_then(|pending| state.message(pending))
                .filter(|pending| pending.status == MessageStatus::Loading);

            match placeholder {
                Some(pending) if message.role() == MessageRole::Assistant => {
                    let content = if message.content.is_empty() {
                        pending.content.clone()
                    } else {
                        message.content.clone()
                    };
                    let replacement = Message {
                        id: message.id.clone(),
                        role: pending.role,
                        content,
                        status: pending.status,
                        timestamp: pending.timestamp,
                        is_streaming: pending.is_streaming,
                    };
                    debug!(from = %pending.id, to = %message.id, "placeholder identity resolved");
                    self.store.replace_message(&pending.id, replacement);
                    summary.replaced += 1;
                }
                _ => {
                    self.store.add_message(Message::new(
                        message.id.clone(),
                        message.role(),
                        message.content.clone(),
                        message.status,
                    ));
                    summary.inserted += 1;
                }
            }
        }

        summary
    }
}
