//! Tests for the history reconciliation poller
//!
//! Timing-sensitive cases run on tokio's paused clock so the 2 second poll
//! interval elapses instantly.

#[cfg(test)]
mod tests {
    use crate::poller::{HistoryPoller, PollSettings, PollStep};
    use crate::store::ConversationStore;
    use crate::test_support::{MockBackend, persisted, persisted_call};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use shared::models::{
        Message, MessageId, MessageRole, MessageStatus, PersistedMessage, Timestamp, ToolCall,
    };
    use std::{rc::Rc, time::Duration};

    fn settings() -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(2),
            recency_window: Duration::from_secs(30),
            quiescence_polls: 3,
            max_polls: 15,
        }
    }

    fn conversation(reply: &str, created_at: Timestamp) -> Vec<PersistedMessage> {
        vec![
            persisted(1, MessageRole::User, "What is the battery life?", created_at),
            persisted(2, MessageRole::Assistant, reply, created_at),
        ]
    }

    fn poller(
        backend: &Rc<MockBackend>,
        settings: PollSettings,
    ) -> (ConversationStore, HistoryPoller<MockBackend>) {
        let store = ConversationStore::detached();
        let poller = HistoryPoller::new(store.clone(), backend.clone(), settings, "c-1");
        (store, poller)
    }

    #[tokio::test]
    async fn test_quiescence_after_three_unchanged_polls() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("0123456789", now)));
        backend.push_history(Some(conversation("0123456789abcde", now)));
        let (store, mut poller) = poller(&backend, settings());

        assert!(poller.load().await);
        assert_eq!(poller.poll_once().await, PollStep::Grew);
        assert!(store.state().messages[1].is_streaming);
        assert_eq!(poller.poll_once().await, PollStep::Unchanged);
        assert_eq!(poller.poll_once().await, PollStep::Unchanged);
        assert_eq!(poller.poll_once().await, PollStep::Quiescent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_after_fourth_poll_and_clears_marker() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("0123456789", now)));
        backend.push_history(Some(conversation("0123456789abcde", now)));
        let (store, poller) = poller(&backend, settings());

        poller.run().await;

        assert_eq!(backend.history_calls.get(), 5);
        let state = store.state();
        let last = state.last_message().unwrap();
        assert_eq!(last.content.len(), 15);
        assert!(!last.is_streaming);
        assert_eq!(last.status, MessageStatus::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_history_is_loaded_without_polling() {
        let old = Timestamp(Timestamp::now().0 - ChronoDuration::minutes(5));
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("Done long ago", old)));
        let (store, poller) = poller(&backend, settings());

        poller.run().await;

        assert_eq!(backend.history_calls.get(), 1);
        let state = store.state();
        assert_eq!(state.messages.len(), 2);
        assert!(!state.is_loading_history);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_budget_exhaustion_settles() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        for reply in ["a", "ab", "abc", "abcd"] {
            backend.push_history(Some(conversation(reply, now)));
        }
        let settings = PollSettings {
            quiescence_polls: 100,
            max_polls: 3,
            ..settings()
        };
        let (store, poller) = poller(&backend, settings);

        poller.run().await;

        assert_eq!(backend.history_calls.get(), 4);
        let state = store.state();
        assert_eq!(state.messages[1].content, "abcd");
        assert!(!state.messages[1].is_streaming);
    }

    #[tokio::test]
    async fn test_missing_history_clears_messages_on_load() {
        let backend = Rc::new(MockBackend::new());
        backend.push_history(None);
        let (store, mut poller) = poller(&backend, settings());
        store.add_message(Message::new(9_i64, MessageRole::User, "stale", MessageStatus::Done));

        assert!(!poller.load().await);

        let state = store.state();
        assert!(state.messages.is_empty());
        assert!(!state.is_loading_history);
    }

    #[tokio::test]
    async fn test_failed_poll_counts_as_unchanged_and_keeps_messages() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("Hello", now)));
        backend.push_history(None);
        let (store, mut poller) = poller(&backend, settings());

        poller.load().await;
        assert_eq!(poller.poll_once().await, PollStep::Unchanged);
        assert_eq!(poller.poll_once().await, PollStep::Unchanged);
        assert_eq!(poller.poll_once().await, PollStep::Quiescent);

        assert_eq!(store.state().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_new_message_counts_as_growth() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("Hello", now)));
        let mut grown = conversation("Hello", now);
        grown.push(persisted(3, MessageRole::User, "Hi", now));
        backend.push_history(Some(grown));
        let (store, mut poller) = poller(&backend, settings());

        poller.load().await;

        assert_eq!(poller.poll_once().await, PollStep::Grew);
        let state = store.state();
        assert_eq!(state.messages.len(), 3);
        assert!(!state.messages[2].is_streaming);
    }

    #[tokio::test]
    async fn test_load_attaches_persisted_tool_calls() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        let mut records = conversation("Battery lasts 18 hours.", now);
        records[1].tool_calls = Some(vec![persisted_call("rag_search", Some("18 hours"))]);
        backend.push_history(Some(records));
        let (store, mut poller) = poller(&backend, settings());

        poller.load().await;

        let state = store.state();
        let calls = state.tool_calls_for(&MessageId::from(2_i64));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "rag_search");
        assert_eq!(calls[0].result.as_deref(), Some("18 hours"));
        assert!(state.tool_calls_for(&MessageId::from(1_i64)).is_empty());
    }

    #[tokio::test]
    async fn test_merge_preserves_in_flight_messages() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(vec![persisted(
            1,
            MessageRole::User,
            "What is the battery life?",
            now,
        )]));
        let (store, mut poller) = poller(&backend, settings());
        let placeholder = MessageId::from("assistant-1-abc");
        store.set_request_in_flight(true);
        store.add_message(Message::new(
            "user-1-abc",
            MessageRole::User,
            "What is the battery life?",
            MessageStatus::Local,
        ));
        store.add_message(Message::new(
            placeholder.clone(),
            MessageRole::Assistant,
            "The Mac",
            MessageStatus::Loading,
        ));

        poller.load().await;

        let state = store.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].id, MessageId::from(1_i64));
        assert_eq!(state.messages[1].id, placeholder);
        assert_eq!(state.messages[1].content, "The Mac");
    }

    #[tokio::test]
    async fn test_saved_partial_reply_takes_over_placeholder() {
        let now = Timestamp::now();
        let backend = Rc::new(MockBackend::new());
        let mut records = conversation("The Mac", now);
        records[1].tool_calls = Some(vec![persisted_call("rag_search", Some("18 hours"))]);
        backend.push_history(Some(records));
        backend.push_history(Some(conversation("The MacBook Air", now)));
        let (store, mut poller) = poller(&backend, settings());
        let placeholder = MessageId::from("assistant-1-abc");
        let saved = MessageId::from(2_i64);
        store.set_request_in_flight(true);
        store.add_message(Message::new(
            "user-1-abc",
            MessageRole::User,
            "What is the battery life?",
            MessageStatus::Local,
        ));
        store.add_message(Message::new(
            placeholder.clone(),
            MessageRole::Assistant,
            "The MacBook",
            MessageStatus::Loading,
        ));
        store.set_pending_message(Some(placeholder.clone()));
        store.add_tool_call(
            &placeholder,
            ToolCall::started("rag_search", json!({"query": "battery"}), now, 0),
        );

        poller.load().await;

        let state = store.state();
        let assistants: Vec<_> = state
            .messages
            .iter()
            .filter(|message| message.role == MessageRole::Assistant)
            .collect();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].id, saved);
        assert_eq!(assistants[0].content, "The MacBook");
        assert_eq!(assistants[0].status, MessageStatus::Loading);
        assert_eq!(state.pending_message_id, Some(saved.clone()));
        assert_eq!(state.tool_calls_for(&saved).len(), 1);
        assert!(state.tool_calls_for(&saved)[0].is_running());
        assert!(state.tool_calls_for(&placeholder).is_empty());

        assert_eq!(poller.poll_once().await, PollStep::Grew);
        let state = store.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, "The MacBook");
        assert_eq!(state.tool_calls_for(&saved).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_history_keeps_in_flight_messages() {
        let backend = Rc::new(MockBackend::new());
        backend.push_history(None);
        let (store, mut poller) = poller(&backend, settings());
        store.set_request_in_flight(true);
        store.add_message(Message::new(
            "assistant-1-abc",
            MessageRole::Assistant,
            "",
            MessageStatus::Loading,
        ));

        poller.load().await;

        assert_eq!(store.state().messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("Hello", Timestamp::now())));
        let (_store, poller) = poller(&backend, settings());
        let local = tokio::task::LocalSet::new();

        local
            .run_until(async {
                let handle = poller.spawn();
                tokio::time::sleep(Duration::from_millis(2500)).await;
                assert_eq!(backend.history_calls.get(), 2);

                drop(handle);
                tokio::time::sleep(Duration::from_secs(60)).await;
                assert_eq!(backend.history_calls.get(), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_polls() {
        let backend = Rc::new(MockBackend::new());
        backend.push_history(Some(conversation("Hello", Timestamp::now())));
        let (_store, poller) = poller(&backend, settings());
        let local = tokio::task::LocalSet::new();

        local
            .run_until(async {
                let handle = poller.spawn();
                tokio::time::sleep(Duration::from_millis(500)).await;
                handle.stop();
                assert!(handle.is_stopped());

                tokio::time::sleep(Duration::from_secs(60)).await;
                assert_eq!(backend.history_calls.get(), 1);
            })
            .await;
    }
}
