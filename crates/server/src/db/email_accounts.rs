//! SMTP account repository.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use autolead_core::{EmailAccountId, UserId};

use super::RepositoryError;
use super::outreach_runs::lock_user;
use crate::models::{EmailAccount, NewEmailAccount};

const ACCOUNT_COLUMNS: &str =
    "id, user_id, email_address, smtp_host, smtp_port, smtp_user, smtp_pass, created_at";

/// Internal row type for `PostgreSQL` email account queries.
#[derive(sqlx::FromRow)]
struct EmailAccountRow {
    id: i32,
    user_id: String,
    email_address: String,
    smtp_host: String,
    smtp_port: i32,
    smtp_user: String,
    smtp_pass: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EmailAccountRow> for EmailAccount {
    type Error = RepositoryError;

    fn try_from(row: EmailAccountRow) -> Result<Self, Self::Error> {
        let smtp_port = u16::try_from(row.smtp_port).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid smtp port: {}", row.smtp_port))
        })?;

        Ok(Self {
            id: EmailAccountId::new(row.id),
            user_id: UserId::new(row.user_id),
            email_address: row.email_address,
            smtp_host: row.smtp_host,
            smtp_port,
            smtp_user: row.smtp_user,
            smtp_pass: SecretString::from(row.smtp_pass),
            created_at: row.created_at,
        })
    }
}

/// Repository for SMTP account database operations.
pub struct EmailAccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailAccountRepository<'a> {
    /// Create a new email account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: &UserId,
        account: &NewEmailAccount,
    ) -> Result<EmailAccount, RepositoryError> {
        let row = sqlx::query_as::<_, EmailAccountRow>(&format!(
            r"
            INSERT INTO email_accounts (user_id, email_address, smtp_host, smtp_port, smtp_user, smtp_pass)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ACCOUNT_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(account.email_address.trim())
        .bind(account.smtp_host.trim())
        .bind(i32::from(account.smtp_port))
        .bind(account.smtp_user.trim())
        .bind(account.smtp_pass.expose_secret())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// List a user's accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored port is out of range.
    pub async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EmailAccount>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmailAccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM email_accounts WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get one of the user's accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: &UserId,
        id: EmailAccountId,
    ) -> Result<Option<EmailAccount>, RepositoryError> {
        let row = sqlx::query_as::<_, EmailAccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM email_accounts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Delete one of the user's accounts.
    ///
    /// An account stays while any of the user's runs short of Completed uses it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an unfinished run uses the account.
    /// Returns `RepositoryError::NotFound` if no such account exists for the user.
    pub async fn delete(&self, user_id: &UserId, id: EmailAccountId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let in_use: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM outreach_runs
                WHERE email_account_id = $1 AND user_id = $2 AND state <> 'completed'
            )
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if in_use {
            return Err(RepositoryError::Conflict(
                "email account is used by an unfinished outreach run".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM email_accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}
