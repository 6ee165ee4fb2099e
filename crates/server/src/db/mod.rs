//! Database operations for `PostgreSQL`.
//!
//! ## Tables
//!
//! - `profiles` - User profiles and AI draft credits
//! - `leads` - Owner-scoped leads with a `lead_status` enum
//! - `email_accounts` - SMTP sender accounts
//! - `outreach_runs` / `outreach_run_leads` - Bulk outreach progress
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p autolead-cli -- migrate
//! ```

pub mod email_accounts;
pub mod leads;
pub mod outreach_runs;
pub mod profiles;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use email_accounts::EmailAccountRepository;
pub use leads::LeadRepository;
pub use outreach_runs::OutreachRunRepository;
pub use profiles::{CreditCheck, ProfileRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
