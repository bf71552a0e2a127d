//! Persistence of the active conversation identity.

use std::{cell::RefCell, rc::Rc};

use tracing::{debug, info};
use uuid::Uuid;

/// Key-value slot holding the active conversation identity.
///
/// Implementations never fail: storage errors are logged and treated as an
/// absent value.
pub trait ConversationIdStore {
    fn get(&self) -> Option<String>;

    fn set(&self, conversation_id: &str);

    fn clear(&self);
}

impl<T: ConversationIdStore + ?Sized> ConversationIdStore for Rc<T> {
    fn get(&self) -> Option<String> {
        (**self).get()
    }

    fn set(&self, conversation_id: &str) {
        (**self).set(conversation_id);
    }

    fn clear(&self) {
        (**self).clear();
    }
}

/// Returns the persisted identity, generating and persisting a fresh v4 UUID
/// when none is stored.
pub fn get_conversation_id<S: ConversationIdStore + ?Sized>(store: &S) -> String {
    if let Some(id) = store.get().filter(|id| !id.trim().is_empty()) {
        return id;
    }
    let id = Uuid::new_v4().to_string();
    info!(conversation_id = %id, "generated new conversation identity");
    store.set(&id);
    id
}

/// In-memory slot; clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdStore {
    value: Rc<RefCell<Option<String>>>,
}

impl MemoryIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(conversation_id: impl Into<String>) -> Self {
        Self {
            value: Rc::new(RefCell::new(Some(conversation_id.into()))),
        }
    }
}

impl ConversationIdStore for MemoryIdStore {
    fn get(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    fn set(&self, conversation_id: &str) {
        debug!(conversation_id, "storing conversation identity in memory");
        *self.value.borrow_mut() = Some(conversation_id.to_string());
    }

    fn clear(&self) {
        self.value.borrow_mut().take();
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::LocalStorageIdStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use gloo_storage::{LocalStorage, Storage};
    use shared::config::ClientConfig;
    use tracing::{debug, warn};

    use super::ConversationIdStore;

    /// Browser `localStorage` slot under a fixed key.
    #[derive(Debug, Clone)]
    pub struct LocalStorageIdStore {
        key: String,
    }

    impl LocalStorageIdStore {
        pub fn new(key: impl Into<String>) -> Self {
            Self { key: key.into() }
        }

        pub fn from_config(config: &ClientConfig) -> Self {
            Self::new(config.conversation_key.clone())
        }
    }

    impl ConversationIdStore for LocalStorageIdStore {
        fn get(&self) -> Option<String> {
            LocalStorage::get::<String>(&self.key)
                .inspect_err(|err| {
                    debug!(key = %self.key, error = %err, "no stored conversation identity");
                })
                .ok()
        }

        fn set(&self, conversation_id: &str) {
            if let Err(err) = LocalStorage::set(&self.key, conversation_id) {
                warn!(key = %self.key, error = %err, "failed to persist conversation identity");
            }
        }

        fn clear(&self) {
            LocalStorage::delete(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_and_persists_identity_when_absent() {
        let store = MemoryIdStore::new();

        let id = get_conversation_id(&store);

        assert_eq!(store.get().as_deref(), Some(id.as_str()));
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_returns_existing_identity() {
        let store = MemoryIdStore::with_value("c-existing");

        assert_eq!(get_conversation_id(&store), "c-existing");
        assert_eq!(get_conversation_id(&store), "c-existing");
    }

    #[test]
    fn test_blank_identity_is_replaced() {
        let store = MemoryIdStore::with_value("  ");

        let id = get_conversation_id(&store);

        assert_ne!(id.trim(), "");
        assert_eq!(store.get(), Some(id));
    }

    #[test]
    fn test_clear_and_shared_clones() {
        let store = MemoryIdStore::with_value("c-1");
        let other = store.clone();

        other.clear();

        assert!(store.get().is_none());
        let handle = Rc::new(store);
        handle.set("c-2");
        assert_eq!(other.get().as_deref(), Some("c-2"));
    }
}
