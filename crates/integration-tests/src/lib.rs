//! Integration tests for AutoLead.
//!
//! # Running Tests
//!
//! ```bash
//! # Offline tests (no server needed)
//! cargo test -p autolead-integration-tests
//!
//! # Live tests against a running server
//! AUTOLEAD_TEST_URL=http://127.0.0.1:8080 \
//! AUTH_SIGNING_SECRET=... \
//! cargo test -p autolead-integration-tests -- --ignored
//! ```
//!
//! Live tests sign identity headers with the same shared secret the auth
//! gateway uses, so the server accepts them as a real user.

use reqwest::{Client, RequestBuilder};
use secrecy::SecretString;

use autolead_server::middleware::auth::{
    SIGNATURE_HEADER, TIMESTAMP_HEADER, USER_EMAIL_HEADER, USER_ID_HEADER, sign_identity,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// A client pointed at a running server.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    secret: Option<SecretString>,
}

impl TestContext {
    /// Read the target server and signing secret from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("AUTOLEAD_TEST_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let secret = std::env::var("AUTH_SIGNING_SECRET")
            .ok()
            .map(SecretString::from);

        Self {
            client: Client::new(),
            base_url,
            secret,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Unauthenticated GET.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// Unauthenticated POST.
    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    /// Unauthenticated DELETE.
    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Attach gateway identity headers for `user_id`.
    ///
    /// # Panics
    ///
    /// Panics if `AUTH_SIGNING_SECRET` is not set.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn signed(&self, request: RequestBuilder, user_id: &str) -> RequestBuilder {
        let secret = self
            .secret
            .as_ref()
            .expect("AUTH_SIGNING_SECRET must be set for signed requests");
        let timestamp = chrono::Utc::now().timestamp();

        request
            .header(USER_ID_HEADER, user_id)
            .header(USER_EMAIL_HEADER, format!("{user_id}@example.com"))
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .header(SIGNATURE_HEADER, sign_identity(secret, timestamp, user_id))
    }
}

/// A user id unlikely to collide with earlier runs.
#[must_use]
pub fn unique_user(prefix: &str) -> String {
    format!("{prefix}_{}", chrono::Utc::now().timestamp_micros())
}
