//! Claude API client.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::ClaudeConfig;

use super::error::{ApiErrorResponse, ClaudeError};
use super::types::{ChatRequest, ChatResponse, Message};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Outreach emails are short; this leaves headroom for a subject line.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key contains invalid header characters or
    /// the HTTP client fails to build.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| ClaudeError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
            }),
        })
    }

    /// Send a chat request and get the complete response.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, messages, system), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
    ) -> Result<ChatResponse, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            system,
        };

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClaudeError::Parse(format!("Failed to parse response: {e}")))?;

        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Claude response received"
        );
        Ok(parsed)
    }

    /// Single-turn completion returning only the text.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::EmptyResponse` if the model produced no text,
    /// otherwise the errors of [`Self::chat`].
    pub async fn complete(&self, prompt: &str) -> Result<String, ClaudeError> {
        let text = self.chat(vec![Message::user(prompt)], None).await?.text();
        if text.is_empty() {
            return Err(ClaudeError::EmptyResponse);
        }
        Ok(text)
    }

    /// Map an error status code to a `ClaudeError`.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClaudeError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ClaudeError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ClaudeError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorResponse>(&body).map_or_else(
                |_| ClaudeError::Api {
                    error_type: "unknown".to_string(),
                    message: body.clone(),
                },
                |api_error| ClaudeError::Api {
                    error_type: api_error.error.error_type,
                    message: api_error.error.message,
                },
            ),
            Err(e) => ClaudeError::Http(e),
        }
    }
}

impl std::fmt::Debug for ClaudeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeClient")
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_claude_client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<ClaudeClient>();
    }

    #[test]
    fn test_new_rejects_invalid_key() {
        let config = ClaudeConfig {
            api_key: SecretString::from("sk-ant\r\nbad"),
            model: "claude-sonnet-4-20250514".to_string(),
        };
        assert!(matches!(
            ClaudeClient::new(&config),
            Err(ClaudeError::Parse(_))
        ));
    }

    #[test]
    fn test_debug_shows_model_only() {
        let config = ClaudeConfig {
            api_key: SecretString::from("sk-ant-abc123"),
            model: "claude-sonnet-4-20250514".to_string(),
        };
        let client = ClaudeClient::new(&config).expect("client");
        let debug = format!("{client:?}");
        assert!(debug.contains("claude-sonnet-4-20250514"));
        assert!(!debug.contains("sk-ant-abc123"));
    }
}
