//! Outreach run repository.
//!
//! Run creation and resumption take a per-user advisory lock so the
//! "no lead in two active runs" check cannot race with another request.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use autolead_core::{EmailAccountId, LeadId, LeadRunState, OutreachRunId, RunState, UserId};

use super::RepositoryError;
use crate::models::{OutreachRun, RunLead};

const RUN_COLUMNS: &str =
    "id, user_id, email_account_id, state, total, processed, created_at, finished_at";

/// Internal row type for `PostgreSQL` run queries.
#[derive(Debug, sqlx::FromRow)]
struct OutreachRunRow {
    id: Uuid,
    user_id: String,
    email_account_id: Option<i32>,
    state: RunState,
    total: i32,
    processed: i32,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl From<OutreachRunRow> for OutreachRun {
    fn from(row: OutreachRunRow) -> Self {
        Self {
            id: OutreachRunId::new(row.id),
            user_id: UserId::new(row.user_id),
            email_account_id: row.email_account_id.map(EmailAccountId::new),
            state: row.state,
            total: row.total,
            processed: row.processed,
            created_at: row.created_at,
            finished_at: row.finished_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RunLeadRow {
    lead_id: Uuid,
    position: i32,
    state: LeadRunState,
    error: Option<String>,
}

impl From<RunLeadRow> for RunLead {
    fn from(row: RunLeadRow) -> Self {
        Self {
            lead_id: LeadId::new(row.lead_id),
            position: row.position,
            state: row.state,
            error: row.error,
        }
    }
}

/// Repository for outreach run database operations.
pub struct OutreachRunRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OutreachRunRepository<'a> {
    /// Create a new outreach run repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a run over `lead_ids` (in selection order), already Running.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any lead already belongs to an
    /// active run of the same user.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        id: OutreachRunId,
        user_id: &UserId,
        email_account_id: Option<EmailAccountId>,
        lead_ids: &[LeadId],
    ) -> Result<OutreachRun, RepositoryError> {
        let total = i32::try_from(lead_ids.len())
            .map_err(|_| RepositoryError::Conflict("too many leads in one run".to_string()))?;
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let uuids: Vec<Uuid> = lead_ids.iter().map(LeadId::as_uuid).collect();
        ensure_not_busy(&mut tx, user_id, &uuids, None).await?;

        let row = sqlx::query_as::<_, OutreachRunRow>(&format!(
            r"
            INSERT INTO outreach_runs (id, user_id, email_account_id, state, total)
            VALUES ($1, $2, $3, 'running', $4)
            RETURNING {RUN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .bind(email_account_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO outreach_run_leads (run_id, lead_id, position)
            SELECT $1, lead_id, (ordinality - 1)::INTEGER
            FROM UNNEST($2::UUID[]) WITH ORDINALITY AS t(lead_id, ordinality)
            ",
        )
        .bind(id)
        .bind(&uuids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Get one of the user's runs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: &UserId,
        id: OutreachRunId,
    ) -> Result<Option<OutreachRun>, RepositoryError> {
        let row = sqlx::query_as::<_, OutreachRunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM outreach_runs WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Per-lead outcomes of a run, in selection order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn leads(&self, id: OutreachRunId) -> Result<Vec<RunLead>, RepositoryError> {
        let rows = sqlx::query_as::<_, RunLeadRow>(
            r"
            SELECT lead_id, position, state, error
            FROM outreach_run_leads
            WHERE run_id = $1
            ORDER BY position ASC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Move a Cancelled or Interrupted run back to Running.
    ///
    /// Returns `None` if the run does not exist for the user or is not in a
    /// resumable state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an unsettled lead of this run
    /// is now part of another active run.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn claim_for_resume(
        &self,
        user_id: &UserId,
        id: OutreachRunId,
    ) -> Result<Option<OutreachRun>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let pending: Vec<Uuid> = sqlx::query_scalar(
            r"
            SELECT lead_id FROM outreach_run_leads
            WHERE run_id = $1 AND state NOT IN ('done', 'failed', 'skipped')
            ",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        ensure_not_busy(&mut tx, user_id, &pending, Some(id)).await?;

        let row = sqlx::query_as::<_, OutreachRunRow>(&format!(
            r"
            UPDATE outreach_runs
            SET state = 'running', finished_at = NULL
            WHERE id = $1 AND user_id = $2 AND state IN ('cancelled', 'interrupted')
            RETURNING {RUN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.map(Into::into))
    }

    /// Set the run state. Terminal states also stamp `finished_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_state(&self, id: OutreachRunId, state: RunState) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE outreach_runs
            SET state = $2,
                finished_at = CASE WHEN $3 THEN NOW() ELSE NULL END
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(state)
        .bind(!state.is_active())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record one lead's sub-state and the run's processed counter together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn record_lead(
        &self,
        id: OutreachRunId,
        lead_id: LeadId,
        state: LeadRunState,
        error: Option<&str>,
        processed: i32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE outreach_run_leads
            SET state = $3, error = $4, updated_at = NOW()
            WHERE run_id = $1 AND lead_id = $2
            ",
        )
        .bind(id)
        .bind(lead_id)
        .bind(state)
        .bind(error)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE outreach_runs SET processed = $2 WHERE id = $1")
            .bind(id)
            .bind(processed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Mark every run left Idle or Running by a previous process as Interrupted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn interrupt_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE outreach_runs
            SET state = 'interrupted', finished_at = NOW()
            WHERE state IN ('idle', 'running')
            ",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Serialize run bookkeeping per user for the rest of the transaction.
pub(super) async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Fail with `Conflict` if any of `lead_ids` is in an active run of the user.
async fn ensure_not_busy(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
    lead_ids: &[Uuid],
    except_run: Option<OutreachRunId>,
) -> Result<(), RepositoryError> {
    if lead_ids.is_empty() {
        return Ok(());
    }

    let busy: Vec<Uuid> = sqlx::query_scalar(
        r"
        SELECT DISTINCT rl.lead_id
        FROM outreach_run_leads rl
        JOIN outreach_runs r ON r.id = rl.run_id
        WHERE r.user_id = $1
          AND r.state IN ('idle', 'running')
          AND rl.lead_id = ANY($2)
          AND ($3::UUID IS NULL OR r.id <> $3)
        ",
    )
    .bind(user_id)
    .bind(lead_ids)
    .bind(except_run)
    .fetch_all(&mut **tx)
    .await?;

    if busy.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = busy.iter().map(Uuid::to_string).collect();
    Err(RepositoryError::Conflict(format!(
        "leads already in an active run: {}",
        ids.join(", ")
    )))
}
