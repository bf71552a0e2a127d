pub mod chat;
pub mod errors;
pub mod history;
pub mod message;
pub mod stream_event;
pub mod timestamp;
pub mod tool_call;

pub use chat::{ChatRequest, DeleteConversationResponse, HealthResponse, SuggestionsResponse};
pub use errors::ErrorResponse;
pub use history::{HistoryResponse, PersistedMessage, PersistedToolCall};
pub use message::{Message, MessageId, MessagePatch, MessageRole, MessageStatus};
pub use stream_event::StreamEvent;
pub use timestamp::Timestamp;
pub use tool_call::ToolCall;
