//! `ChatSession` wires the coordinator, poller, resolver and suggestion
//! loader around one shared [`ConversationStore`].

use std::rc::Rc;

use shared::config::ClientConfig;
use shared::models::StreamEvent;
use tracing::{debug, info, warn};

use crate::api::ChatBackend;
use crate::coordinator::{StreamingCoordinator, SubmitOutcome};
use crate::identity::{self, ConversationIdStore};
use crate::poller::{HistoryPoller, PollSettings, PollerHandle};
use crate::resolver::{ExternalMessage, MessageResolver, Reconciled};
use crate::store::ConversationStore;
use crate::suggestions::SuggestionLoader;

pub struct ChatSession<B: ?Sized, S: ?Sized> {
    store: ConversationStore,
    backend: Rc<B>,
    ids: Rc<S>,
    settings: PollSettings,
    coordinator: StreamingCoordinator<B, S>,
    resolver: MessageResolver,
    suggestions: SuggestionLoader<B>,
    poller: Option<PollerHandle>,
    watched: Option<String>,
}

impl<B: ?Sized, S: ?Sized> std::fmt::Debug for ChatSession<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl<B, S> ChatSession<B, S>
where
    B: ChatBackend + ?Sized + 'static,
    S: ConversationIdStore + ?Sized + 'static,
{
    pub fn new(store: ConversationStore, backend: Rc<B>, ids: Rc<S>, config: &ClientConfig) -> Self {
        Self {
            coordinator: StreamingCoordinator::new(store.clone(), backend.clone(), ids.clone()),
            resolver: MessageResolver::new(store.clone()),
            suggestions: SuggestionLoader::new(
                store.clone(),
                backend.clone(),
                config.default_suggestions.clone(),
            ),
            settings: PollSettings::from(config),
            store,
            backend,
            ids,
            poller: None,
            watched: None,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// The active conversation identity, adopting or generating one when the
    /// store has none yet.
    pub fn get_conversation_id(&self) -> String {
        if let Some(id) = self.store.conversation_id() {
            return id;
        }
        let id = identity::get_conversation_id(&*self.ids);
        self.store.set_conversation_id(Some(id.clone()));
        id
    }

    /// Registers a callback that sees every stream event as it is decoded.
    pub fn on_event(&mut self, observer: impl FnMut(&StreamEvent) + 'static) {
        self.coordinator.set_observer(observer);
    }

    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let outcome = self.coordinator.submit(text).await;
        if matches!(outcome, SubmitOutcome::Completed { .. }) {
            if self.poller.is_some() && self.watched != self.store.conversation_id() {
                self.watch_conversation();
            }
            self.suggestions.refresh().await;
        }
        outcome
    }

    /// Starts the history poller for the active identity, tearing down the
    /// previous one. Calling it again for the same identity is a no-op.
    ///
    /// Natively this must run inside a `tokio::task::LocalSet`.
    pub fn watch_conversation(&mut self) {
        let conversation_id = self.get_conversation_id();
        if self.poller.is_some() && self.watched.as_deref() == Some(conversation_id.as_str()) {
            return;
        }
        if let Some(previous) = self.poller.take() {
            previous.stop();
        }
        debug!(conversation_id = %conversation_id, "watching conversation history");
        let poller = HistoryPoller::new(
            self.store.clone(),
            self.backend.clone(),
            self.settings,
            conversation_id.clone(),
        );
        self.poller = Some(poller.spawn());
        self.watched = Some(conversation_id);
    }

    /// One history load without polling.
    pub async fn load_history(&self) {
        let conversation_id = self.get_conversation_id();
        let mut poller = HistoryPoller::new(
            self.store.clone(),
            self.backend.clone(),
            self.settings,
            conversation_id,
        );
        poller.load().await;
    }

    pub fn stop_watching(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        self.watched = None;
    }

    pub fn reconcile(&self, external: &[ExternalMessage]) -> Reconciled {
        self.resolver.reconcile(external)
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.suggestions.current()
    }

    pub async fn refresh_suggestions(&self) -> bool {
        self.suggestions.refresh().await
    }

    /// Deletes the conversation on the backend (best effort) and resets all
    /// local state, including the persisted identity.
    pub async fn clear_conversation(&mut self) {
        self.stop_watching();
        let conversation_id = self.store.conversation_id().or_else(|| self.ids.get());
        if let Some(id) = conversation_id {
            match self.backend.delete_conversation(&id).await {
                Ok(()) => info!(conversation_id = %id, "conversation deleted"),
                Err(err) => {
                    warn!(conversation_id = %id, error = %err, "failed to delete conversation");
                }
            }
        }
        self.store.clear();
        self.ids.clear();
    }
}
