//! Profile management commands.
//!
//! # Usage
//!
//! ```bash
//! # Top up a user's credits
//! autolead-cli profile set-credits -u user_123 -c 50
//!
//! # Grant the admin flag
//! autolead-cli profile promote -u user_123
//! ```

use sqlx::PgPool;
use thiserror::Error;

use autolead_core::UserId;
use autolead_server::db::RepositoryError;
use autolead_server::db::profiles::ProfileRepository;

use super::migrate::{self, MigrationError};

/// Errors that can occur during profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Setup(#[from] MigrationError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No profile for user: {0}")]
    NotFound(String),

    #[error("Invalid credits: {0}")]
    InvalidCredits(i32),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl ProfileError {
    fn from_repository(user_id: &str, error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound(user_id.to_owned()),
            other => Self::Repository(other),
        }
    }
}

async fn connect() -> Result<PgPool, ProfileError> {
    let database_url = migrate::database_url()?;
    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(&database_url).await?)
}

/// Overwrite a profile's credit balance.
///
/// # Errors
///
/// Returns an error if the profile does not exist or `credits` is negative.
pub async fn set_credits(user_id: &str, credits: i32) -> Result<(), ProfileError> {
    if credits < 0 {
        return Err(ProfileError::InvalidCredits(credits));
    }

    let pool = connect().await?;
    let profile = ProfileRepository::new(&pool)
        .set_credits(&UserId::new(user_id), credits)
        .await
        .map_err(|e| ProfileError::from_repository(user_id, e))?;

    tracing::info!(
        user_id = %profile.id,
        credits = profile.credits,
        "Credits updated"
    );
    Ok(())
}

/// Grant the admin flag to a profile.
///
/// # Errors
///
/// Returns an error if the profile does not exist.
pub async fn promote(user_id: &str) -> Result<(), ProfileError> {
    let pool = connect().await?;
    let profile = ProfileRepository::new(&pool)
        .promote(&UserId::new(user_id))
        .await
        .map_err(|e| ProfileError::from_repository(user_id, e))?;

    tracing::info!(user_id = %profile.id, email = %profile.email, "Profile promoted to admin");
    Ok(())
}
