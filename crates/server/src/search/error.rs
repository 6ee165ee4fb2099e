//! Error types for the search client.

use thiserror::Error;

/// Errors that can occur when querying the Maps search API.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited or out of search credits.
    #[error("rate limited")]
    RateLimited,

    /// Invalid API key.
    #[error("unauthorized: invalid API key")]
    Unauthorized,

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display() {
        let err = SearchError::Api {
            status: 500,
            message: "upstream exploded".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 500 - upstream exploded");
        assert_eq!(
            SearchError::Unauthorized.to_string(),
            "unauthorized: invalid API key"
        );
    }
}
