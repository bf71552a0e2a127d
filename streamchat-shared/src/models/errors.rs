use serde::{Deserialize, Serialize};

/// Error body returned by the backend (`{"detail": "..."}`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Extracts the detail from a raw body, falling back to the body itself.
    #[must_use]
    pub fn detail_from_body(body: &str) -> String {
        serde_json::from_str::<Self>(body).map_or_else(|_| body.trim().to_string(), |e| e.detail)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for ErrorResponse {}
