//! Serper Maps API client.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::SearchConfig;

use super::error::SearchError;
use super::types::{RawPlace, SearchRequest, SearchResponse};

const SERPER_MAPS_URL: &str = "https://google.serper.dev/maps";

/// Maps search client.
#[derive(Clone)]
pub struct SerperClient {
    inner: Arc<SerperClientInner>,
}

struct SerperClientInner {
    client: reqwest::Client,
    endpoint: String,
}

impl SerperClient {
    /// Create a new search client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Self::with_endpoint(config, SERPER_MAPS_URL)
    }

    /// Create a client against a different endpoint (e.g. a local stub).
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_endpoint(config: &SearchConfig, endpoint: &str) -> Result<Self, SearchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-API-KEY",
            HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| SearchError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(SerperClientInner {
                client,
                endpoint: endpoint.to_string(),
            }),
        })
    }

    /// Search for places matching `"{keyword} in {location}"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with an
    /// error status.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str, location: &str) -> Result<Vec<RawPlace>, SearchError> {
        let query = build_query(keyword, location);
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(&SearchRequest { q: &query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::parse_error(response).await);
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("Failed to parse response: {e}")))?;

        tracing::info!(count = body.places.len(), "Search returned places");
        Ok(body.places)
    }

    async fn parse_error(response: reqwest::Response) -> SearchError {
        let status = response.status().as_u16();
        match status {
            401 | 403 => SearchError::Unauthorized,
            429 => SearchError::RateLimited,
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                SearchError::Api { status, message }
            }
        }
    }
}

impl std::fmt::Debug for SerperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperClient")
            .field("endpoint", &self.inner.endpoint)
            .finish_non_exhaustive()
    }
}

/// The free-text query sent to the API.
#[must_use]
pub fn build_query(keyword: &str, location: &str) -> String {
    format!("{} in {}", keyword.trim(), location.trim())
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(" dentist ", "Austin, TX "), "dentist in Austin, TX");
    }

    #[test]
    fn test_client_rejects_bad_header_key() {
        let config = SearchConfig {
            api_key: SecretString::from("bad\nkey"),
        };
        assert!(matches!(
            SerperClient::new(&config),
            Err(SearchError::Parse(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = SearchConfig {
            api_key: SecretString::from("serper-key-4f2a"),
        };
        let client = SerperClient::new(&config).expect("client");
        assert!(!format!("{client:?}").contains("serper-key-4f2a"));
    }

    #[test]
    fn test_serper_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<SerperClient>();
    }
}
