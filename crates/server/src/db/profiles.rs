//! Profile repository and credit ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use autolead_core::UserId;

use super::RepositoryError;
use crate::models::Profile;
use crate::services::drafts::CreditLedger;

/// Internal row type for `PostgreSQL` profile queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    credits: i32,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: UserId::new(row.id),
            email: row.email,
            credits: row.credits,
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

/// Outcome of trying to spend one credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditCheck {
    /// One credit was spent.
    Consumed { remaining: i32 },
    /// The profile has no credits left. Nothing was spent.
    Exhausted,
    /// No profile row exists for the user.
    NoProfile,
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, credits, is_admin, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a profile, creating it with `initial_credits` on first access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(
        &self,
        id: &UserId,
        email: &str,
        initial_credits: i32,
    ) -> Result<Profile, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO profiles (id, email, credits)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING id, email, credits, is_admin, created_at
            ",
        )
        .bind(id)
        .bind(email)
        .bind(initial_credits)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// List all profiles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, credits, is_admin, created_at FROM profiles ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Set a profile's credits and admin flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    /// Returns `RepositoryError::Conflict` if `credits` is negative.
    pub async fn update_admin_fields(
        &self,
        id: &UserId,
        credits: i32,
        is_admin: bool,
    ) -> Result<Profile, RepositoryError> {
        if credits < 0 {
            return Err(RepositoryError::Conflict(
                "credits must not be negative".to_string(),
            ));
        }

        sqlx::query_as::<_, ProfileRow>(
            r"
            UPDATE profiles SET credits = $2, is_admin = $3
            WHERE id = $1
            RETURNING id, email, credits, is_admin, created_at
            ",
        )
        .bind(id)
        .bind(credits)
        .bind(is_admin)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Set a profile's credits, keeping the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    /// Returns `RepositoryError::Conflict` if `credits` is negative.
    pub async fn set_credits(&self, id: &UserId, credits: i32) -> Result<Profile, RepositoryError> {
        if credits < 0 {
            return Err(RepositoryError::Conflict(
                "credits must not be negative".to_string(),
            ));
        }

        sqlx::query_as::<_, ProfileRow>(
            r"
            UPDATE profiles SET credits = $2
            WHERE id = $1
            RETURNING id, email, credits, is_admin, created_at
            ",
        )
        .bind(id)
        .bind(credits)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Grant the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn promote(&self, id: &UserId) -> Result<Profile, RepositoryError> {
        sqlx::query_as::<_, ProfileRow>(
            r"
            UPDATE profiles SET is_admin = TRUE
            WHERE id = $1
            RETURNING id, email, credits, is_admin, created_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Spend one credit if the balance allows it.
    ///
    /// The check and the decrement happen in a single statement, so two
    /// concurrent requests cannot both spend the last credit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn try_consume_credit(&self, id: &UserId) -> Result<CreditCheck, RepositoryError> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE profiles SET credits = credits - 1
            WHERE id = $1 AND credits > 0
            RETURNING credits
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(CreditCheck::Consumed { remaining });
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM profiles WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(if exists {
            CreditCheck::Exhausted
        } else {
            CreditCheck::NoProfile
        })
    }

    /// Give back a credit spent by [`Self::try_consume_credit`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn refund_credit(&self, id: &UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE profiles SET credits = credits + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// [`CreditLedger`] backed by the `profiles` table.
#[derive(Clone)]
pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn try_consume(&self, user_id: &UserId) -> Result<CreditCheck, RepositoryError> {
        ProfileRepository::new(&self.pool)
            .try_consume_credit(user_id)
            .await
    }

    async fn refund(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        ProfileRepository::new(&self.pool).refund_credit(user_id).await
    }
}
