use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream::LocalBoxStream};
use once_cell::unsync::OnceCell;
use reqwest::{Client, Response, StatusCode};
use shared::config::ClientConfig;
use shared::models::{
    ChatRequest, DeleteConversationResponse, ErrorResponse, HealthResponse, HistoryResponse,
    SuggestionsResponse,
};
use thiserror::Error;

thread_local! {
    static SHARED_CLIENT: OnceCell<ChatClient> = const { OnceCell::new() };
}

/// Raw response body of a chat submission, chunk by chunk.
pub type ByteStream = LocalBoxStream<'static, ClientResult<Vec<u8>>>;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failures of the request-issuing collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request rejected with {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("resource not found")]
    NotFound,

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("stream failed: {message}")]
    Stream { message: String },
}

impl ClientError {
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

/// The backend operations the reconciliation core depends on.
#[async_trait(?Send)]
pub trait ChatBackend {
    /// Submits a user message; the response body is the event stream.
    async fn send_message(&self, request: &ChatRequest) -> ClientResult<ByteStream>;

    async fn fetch_history(&self, conversation_id: &str) -> ClientResult<HistoryResponse>;

    async fn delete_conversation(&self, conversation_id: &str) -> ClientResult<()>;

    async fn fetch_suggestions(&self, conversation_id: &str) -> ClientResult<SuggestionsResponse>;
}

/// HTTP implementation of [`ChatBackend`].
#[derive(Clone, Debug)]
pub struct ChatClient {
    base_url: String,
    client: Client,
}

impl ChatClient {
    /// Create a new API client with the provided base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.api_base_url)
    }

    /// Client bound to the compiled-in default configuration, one per thread.
    pub fn shared() -> Self {
        SHARED_CLIENT.with(|cell| {
            cell.get_or_init(|| Self::from_config(&ClientConfig::default()))
                .clone()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status,
                detail: ErrorResponse::detail_from_body(&body),
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.get(self.api_url(path)).send().await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Probe the backend health endpoint.
    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.get_json("health").await
    }
}

#[async_trait(?Send)]
impl ChatBackend for ChatClient {
    async fn send_message(&self, request: &ChatRequest) -> ClientResult<ByteStream> {
        let response = self
            .client
            .post(self.api_url("chat"))
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(ClientError::from)
            .boxed_local())
    }

    async fn fetch_history(&self, conversation_id: &str) -> ClientResult<HistoryResponse> {
        self.get_json(&format!("conversations/{conversation_id}/history"))
            .await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.api_url(&format!("conversations/{conversation_id}")))
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        let ack: DeleteConversationResponse = serde_json::from_str(&body)?;
        if ack.success {
            Ok(())
        } else {
            Err(ClientError::Status {
                status: StatusCode::OK,
                detail: "delete was not acknowledged".to_string(),
            })
        }
    }

    async fn fetch_suggestions(&self, conversation_id: &str) -> ClientResult<SuggestionsResponse> {
        self.get_json(&format!("conversations/{conversation_id}/suggestions"))
            .await
    }
}
