#![cfg_attr(not(test), forbid(unsafe_code))]

//! Streaming reconciliation core of the Streamchat client.
//!
//! The [`decoder`] turns a chunked response body into typed events, the
//! [`coordinator`] applies them to the [`store`], the [`poller`] merges
//! persisted history, and the [`resolver`] swaps placeholder identities for
//! external ones. Everything runs on one thread and meets in the store.

pub mod api;
pub mod coordinator;
pub mod decoder;
pub mod identity;
pub mod poller;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod store;
pub mod suggestions;

#[cfg(test)]
mod poller_test;
#[cfg(test)]
mod test_support;

pub use api::{ByteStream, ChatBackend, ChatClient, ClientError, ClientResult};
pub use coordinator::{EventObserver, StreamingCoordinator, SubmitOutcome};
pub use identity::{ConversationIdStore, MemoryIdStore, get_conversation_id};
#[cfg(target_arch = "wasm32")]
pub use identity::LocalStorageIdStore;
pub use poller::{HistoryPoller, PollSettings, PollStep, PollerHandle};
pub use resolver::{ExternalMessage, MessageResolver, Reconciled};
pub use session::ChatSession;
pub use store::{ConversationState, ConversationStore};
pub use suggestions::SuggestionLoader;
