use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Response of `GET /conversations/{id}/suggestions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Response of `DELETE /conversations/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteConversationResponse {
    #[serde(default)]
    pub success: bool,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub agent_initialized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_missing_conversation() {
        let request = ChatRequest {
            message: "hi".into(),
            conversation_id: None,
        };

        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"message":"hi"}"#);
    }

    #[test]
    fn chat_request_carries_conversation() {
        let request = ChatRequest {
            message: "What is the battery life?".into(),
            conversation_id: Some("c-1".into()),
        };
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains(r#""conversation_id":"c-1""#));
    }

    #[test]
    fn suggestions_default_to_empty() {
        let response: SuggestionsResponse = serde_json::from_str("{}").unwrap();

        assert!(response.suggestions.is_empty());
    }

    #[test]
    fn health_response_decodes() {
        let health: HealthResponse =
            serde_json::from_str(r#"{"status":"healthy","agent_initialized":true}"#).unwrap();

        assert_eq!(health.status, "healthy");
        assert!(health.agent_initialized);
    }
}
