//! Lead repository.
//!
//! Every query is scoped by owner except [`LeadRepository::mark_opened`],
//! which is driven by anonymous tracking-pixel requests.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use autolead_core::{LeadId, LeadStatus, UserId};

use super::RepositoryError;
use crate::models::{DailyCount, DashboardStats, Enrichment, Lead, NewLead};

const LEAD_COLUMNS: &str = "id, user_id, name, address, phone, website, category, email, \
                            rating, review_count, status, created_at, opened_at";

/// Internal row type for `PostgreSQL` lead queries.
#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    user_id: String,
    name: String,
    address: String,
    phone: String,
    website: String,
    category: String,
    email: String,
    rating: f64,
    review_count: i32,
    status: LeadStatus,
    created_at: DateTime<Utc>,
    opened_at: Option<DateTime<Utc>>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Self {
            id: LeadId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            address: row.address,
            phone: row.phone,
            website: row.website,
            category: row.category,
            email: row.email,
            rating: row.rating,
            review_count: row.review_count,
            status: row.status,
            created_at: row.created_at,
            opened_at: row.opened_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DailyCountRow {
    date: String,
    count: i64,
}

/// Repository for lead database operations.
pub struct LeadRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LeadRepository<'a> {
    /// Create a new lead repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a batch of search results for `user_id`, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is stored then.
    pub async fn insert_many(
        &self,
        user_id: &UserId,
        leads: &[NewLead],
    ) -> Result<Vec<Lead>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(leads.len());

        for lead in leads {
            let row = sqlx::query_as::<_, LeadRow>(&format!(
                r"
                INSERT INTO leads (user_id, name, address, phone, website, category,
                                   email, rating, review_count, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {LEAD_COLUMNS}
                "
            ))
            .bind(user_id)
            .bind(&lead.name)
            .bind(&lead.address)
            .bind(&lead.phone)
            .bind(&lead.website)
            .bind(&lead.category)
            .bind(&lead.email)
            .bind(lead.rating)
            .bind(lead.review_count)
            .bind(LeadStatus::New)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row.into());
        }

        tx.commit().await?;
        Ok(stored)
    }

    /// List a user's leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Lead>, RepositoryError> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one of the user's leads.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: &UserId,
        id: LeadId,
    ) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get several of the user's leads. Unknown or foreign ids are omitted;
    /// order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        user_id: &UserId,
        ids: &[LeadId],
    ) -> Result<Vec<Lead>, RepositoryError> {
        let ids: Vec<Uuid> = ids.iter().map(LeadId::as_uuid).collect();
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ANY($1) AND user_id = $2"
        ))
        .bind(&ids)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Store an enrichment result on the lead.
    ///
    /// Leads that were already contacted are left untouched. Returns whether
    /// a row was updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn apply_enrichment(
        &self,
        user_id: &UserId,
        id: LeadId,
        enrichment: &Enrichment,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE leads
            SET email = $3, status = $4
            WHERE id = $1 AND user_id = $2
              AND status NOT IN ('contacted', 'opened')
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&enrichment.email)
        .bind(enrichment.status)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a lead Contacted. An Opened lead keeps its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_contacted(
        &self,
        user_id: &UserId,
        id: LeadId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE leads
            SET status = 'contacted'
            WHERE id = $1 AND user_id = $2 AND status <> 'opened'
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record an email open.
    ///
    /// Only Contacted or Opened leads move to Opened, and the first open
    /// time is kept. Returns whether a row was updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_opened(&self, id: LeadId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE leads
            SET status = 'opened', opened_at = COALESCE(opened_at, NOW())
            WHERE id = $1 AND status IN ('contacted', 'opened')
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Dashboard counters for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard_stats(&self, user_id: &UserId) -> Result<DashboardStats, RepositoryError> {
        let (total, contacted): (i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status IN ('contacted', 'opened'))
            FROM leads
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let growth = sqlx::query_as::<_, DailyCountRow>(
            r"
            SELECT date, count FROM (
                SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date,
                       COUNT(*) AS count
                FROM leads
                WHERE user_id = $1
                GROUP BY 1
                ORDER BY 1 DESC
                LIMIT 7
            ) recent
            ORDER BY date ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| DailyCount {
            date: row.date,
            count: row.count,
        })
        .collect();

        Ok(DashboardStats::new(total, contacted, growth))
    }
}
