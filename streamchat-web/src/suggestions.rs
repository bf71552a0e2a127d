//! Follow-up prompt suggestions for the active conversation.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::api::ChatBackend;
use crate::store::ConversationStore;

#[derive(Debug)]
pub struct SuggestionLoader<B: ?Sized> {
    store: ConversationStore,
    backend: Rc<B>,
    defaults: Vec<String>,
}

impl<B> SuggestionLoader<B>
where
    B: ChatBackend + ?Sized,
{
    pub fn new(store: ConversationStore, backend: Rc<B>, defaults: Vec<String>) -> Self {
        Self {
            store,
            backend,
            defaults,
        }
    }

    /// Suggestions to display: the stored ones, or the defaults before any
    /// have been fetched.
    pub fn current(&self) -> Vec<String> {
        let state = self.store.state();
        if state.suggestions.is_empty() {
            self.defaults.clone()
        } else {
            state.suggestions.clone()
        }
    }

    /// Fetches suggestions into the store. Skipped while a request is in
    /// flight or without an active conversation; returns whether the store
    /// was refreshed.
    pub async fn refresh(&self) -> bool {
        let state = self.store.state();
        if state.is_request_in_flight {
            debug!("skipping suggestions while a request is in flight");
            return false;
        }
        let Some(conversation_id) = state.conversation_id.clone() else {
            return false;
        };

        match self.backend.fetch_suggestions(&conversation_id).await {
            Ok(response) if response.suggestions.is_empty() => {
                self.store.set_suggestions(self.defaults.clone());
                true
            }
            Ok(response) => {
                self.store.set_suggestions(response.suggestions);
                true
            }
            Err(err) => {
                warn!(conversation_id = %conversation_id, error = %err, "failed to fetch suggestions");
                false
            }
        }
    }
}
