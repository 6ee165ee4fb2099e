//! Contact email discovery from a lead's website.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::models::Enrichment;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Invalid regex")
});

/// Stored in place of a website the business never listed.
pub const NO_WEBSITE: &str = "N/A";

/// Asset names like `logo@2x.png` look like addresses to the pattern.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

/// Failure to load a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// Loads the body of a web page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`PageFetcher`] over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("autolead/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Whether a website value points anywhere: a bare scheme has no host.
#[must_use]
pub fn has_website(website: &str) -> bool {
    let website = website.trim();
    !website.is_empty()
        && !website.eq_ignore_ascii_case(NO_WEBSITE)
        && !website_host(website).is_empty()
}

/// First email in `html` that is not an image asset name.
#[must_use]
pub fn find_email(html: &str) -> Option<String> {
    EMAIL_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|candidate| {
            let lower = candidate.to_ascii_lowercase();
            !IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .map(str::to_string)
}

/// `https://` is assumed when the value carries no scheme.
#[must_use]
pub fn page_url(website: &str) -> String {
    let website = website.trim();
    if website.contains("://") {
        website.to_string()
    } else {
        format!("https://{website}")
    }
}

/// Bare host of a website: no scheme, leading `www.`, port or path.
#[must_use]
pub fn website_host(website: &str) -> String {
    let host = Url::parse(&page_url(website))
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| {
            let rest = website
                .trim()
                .split_once("://")
                .map_or(website.trim(), |(_, rest)| rest);
            rest.split(['/', '?', '#', ':'])
                .next()
                .unwrap_or_default()
                .to_string()
        });
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// The address assumed when none can be found.
#[must_use]
pub fn guess_email(website: &str) -> String {
    format!("info@{}", website_host(website))
}

/// Finds a contact email for a lead.
#[derive(Clone)]
pub struct Enricher {
    fetcher: Arc<dyn PageFetcher>,
}

impl Enricher {
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Scan the website for an address, guessing `info@<host>` when nothing
    /// usable turns up. A lead without a website is never fetched.
    #[instrument(skip(self))]
    pub async fn enrich(&self, website: &str) -> Enrichment {
        if !has_website(website) {
            return Enrichment::no_website();
        }

        match self.fetcher.fetch(&page_url(website)).await {
            Ok(html) => {
                if let Some(email) = find_email(&html) {
                    tracing::debug!(%email, "Found email on website");
                    return Enrichment::discovered(email);
                }
                tracing::debug!("No email on website");
            }
            Err(e) => {
                tracing::info!(error = %e, "Website fetch failed");
            }
        }

        Enrichment::guessed(guess_email(website))
    }
}
