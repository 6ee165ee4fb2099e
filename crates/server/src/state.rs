//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;
use thiserror::Error;

use crate::claude::{ClaudeClient, ClaudeError};
use crate::config::ServerConfig;
use crate::db::profiles::PgCreditLedger;
use crate::search::{SearchError, SerperClient};
use crate::services::drafts::DraftService;
use crate::services::email::EmailService;
use crate::services::enrichment::{Enricher, FetchError, HttpPageFetcher};
use crate::services::outreach::OutreachService;

/// Failure to build a client at start-up.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("search client: {0}")]
    Search(#[from] SearchError),

    #[error("Claude client: {0}")]
    Claude(#[from] ClaudeError),

    #[error("page fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    search: SerperClient,
    drafts: DraftService,
    enricher: Enricher,
    email: EmailService,
    outreach: OutreachService,
}

impl AppState {
    /// Build every client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any client cannot be configured.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let search = SerperClient::new(&config.search)?;
        let claude = ClaudeClient::new(&config.claude)?;
        let drafts = DraftService::new(
            Arc::new(claude),
            Arc::new(PgCreditLedger::new(pool.clone())),
        );
        let enricher = Enricher::new(Arc::new(HttpPageFetcher::new(
            config.outreach.enrich_timeout,
        )?));
        let email = EmailService::new(&config.email, config.public_url.clone())?;
        let outreach = OutreachService::new(
            pool.clone(),
            drafts.clone(),
            email.clone(),
            config.outreach.inter_lead_delay,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                search,
                drafts,
                enricher,
                email,
                outreach,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn search(&self) -> &SerperClient {
        &self.inner.search
    }

    #[must_use]
    pub fn drafts(&self) -> &DraftService {
        &self.inner.drafts
    }

    #[must_use]
    pub fn enricher(&self) -> &Enricher {
        &self.inner.enricher
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    #[must_use]
    pub fn outreach(&self) -> &OutreachService {
        &self.inner.outreach
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.inner.pool.clone()
    }
}
