use thiserror::Error;

/// Message shown whenever the service gives us nothing better to say.
pub const FALLBACK_MESSAGE: &str = "Request failed";

/// Client-level error type.
/// Every failure a request can hit collapses into one of these before it
/// reaches the orchestrator, which turns it into a user-facing message.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {}", .message.as_deref().unwrap_or(FALLBACK_MESSAGE))]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("top_k must be one of 5..=10, got {0}")]
    InvalidTopK(u8),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// The single place a failure is turned into the text the user sees.
    /// Only an application error carrying a `detail` gets through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api {
                message: Some(msg), ..
            } if !msg.is_empty() => msg.clone(),
            ClientError::Api { status, .. } => {
                tracing::warn!("API error without detail (status {status})");
                FALLBACK_MESSAGE.to_string()
            }
            ClientError::Http(e) => {
                tracing::error!("Transport error: {e}");
                FALLBACK_MESSAGE.to_string()
            }
            ClientError::Decode(e) => {
                tracing::error!("Undecodable response body: {e}");
                FALLBACK_MESSAGE.to_string()
            }
            ClientError::InvalidTopK(_) | ClientError::InvalidBaseUrl(_) => self.to_string(),
        }
    }
}
