use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use std::collections::BTreeMap;
use uuid::Uuid;

use movely_core::{Job, JobStatus, DEFAULT_MAX_ATTEMPTS};

use super::session::{parse_optional_timestamp, parse_timestamp};
use super::{JobRepository, RepositoryError};
use crate::DbPool;

/// Enqueue parameters. Priority is higher-first; `delay_seconds` shifts the
/// first execution into the future.
#[derive(Clone, Debug)]
pub struct NewJob {
    pub tenant_id: String,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_attempts: i32,
    pub delay_seconds: i64,
}

impl NewJob {
    pub fn new(
        tenant_id: impl Into<String>,
        job_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            job_type: job_type.into(),
            payload,
            priority: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_seconds: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_delay_seconds(mut self, delay_seconds: i64) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }
}

pub struct SqlJobRepository {
    pool: DbPool,
}

impl SqlJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const MAX_ERROR_LEN: usize = 2000;

#[async_trait]
impl JobRepository for SqlJobRepository {
    async fn enqueue(&self, job: NewJob) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let scheduled_at = now + Duration::seconds(job.delay_seconds.max(0));

        sqlx::query(
            "INSERT INTO jobs (id, tenant_id, job_type, payload, status, priority, attempts, max_attempts, scheduled_at, created_at)
             VALUES (?, ?, ?, ?, 'pending', ?, 0, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&job.tenant_id)
        .bind(&job.job_type)
        .bind(job.payload.to_string())
        .bind(job.priority)
        .bind(job.max_attempts)
        .bind(scheduled_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            event_name = "job.enqueued",
            job_id = %id,
            job_type = %job.job_type,
            priority = job.priority,
            "job enqueued"
        );
        Ok(id)
    }

    async fn claim_one(&self, job_types: &[&str]) -> Result<Option<Job>, RepositoryError> {
        if job_types.is_empty() {
            return Ok(None);
        }
        let now = Utc::now();

        // Single UPDATE with an embedded candidate select: the claim and the
        // attempts bump are one atomic statement, so exactly one worker wins
        // a given row.
        let placeholders = vec!["?"; job_types.len()].join(", ");
        let sql = format!(
            "UPDATE jobs
             SET status = 'running', started_at = ?, attempts = attempts + 1
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'pending' AND scheduled_at <= ? AND job_type IN ({placeholders})
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
             )
             RETURNING *",
        );

        let mut query = sqlx::query(&sql).bind(now.to_rfc3339()).bind(now.to_rfc3339());
        for job_type in job_types {
            query = query.bind(*job_type);
        }

        let row = query.fetch_optional(&self.pool).await?;
        row.map(job_from_row).transpose()
    }

    async fn complete(&self, job_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE jobs SET status = 'completed', completed_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail(
        &self,
        job_id: &str,
        error_message: &str,
        retry_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let truncated: String = error_message.chars().take(MAX_ERROR_LEN).collect();
        sqlx::query(
            "UPDATE jobs
             SET error_message = ?,
                 status = CASE WHEN attempts < max_attempts THEN 'pending' ELSE 'failed' END,
                 scheduled_at = CASE WHEN attempts < max_attempts THEN ? ELSE scheduled_at END,
                 completed_at = CASE WHEN attempts >= max_attempts THEN ? ELSE NULL END,
                 started_at = NULL
             WHERE id = ?",
        )
        .bind(&truncated)
        .bind(retry_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_permanent(
        &self,
        job_id: &str,
        error_message: &str,
    ) -> Result<(), RepositoryError> {
        let truncated: String = error_message.chars().take(MAX_ERROR_LEN).collect();
        sqlx::query(
            "UPDATE jobs
             SET status = 'failed', error_message = ?, completed_at = ?, started_at = NULL
             WHERE id = ?",
        )
        .bind(&truncated)
        .bind(Utc::now().to_rfc3339())
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_stale_running(&self, lease_timeout_secs: i64) -> Result<u64, RepositoryError> {
        let now = Utc::now();
        let cutoff = now - Duration::seconds(lease_timeout_secs);
        let result = sqlx::query(
            "UPDATE jobs
             SET status = 'pending', scheduled_at = ?, started_at = NULL
             WHERE status = 'running' AND started_at < ?",
        )
        .bind(now.to_rfc3339())
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let reset = result.rows_affected();
        if reset > 0 {
            tracing::warn!(
                event_name = "job.stale_reset",
                reset,
                lease_timeout_secs,
                "stale running jobs returned to pending"
            );
        }
        Ok(reset)
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(job_from_row).transpose()
    }

    async fn count_by_status(&self) -> Result<BTreeMap<String, i64>, RepositoryError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        let mut counts = BTreeMap::new();
        for row in rows {
            counts.insert(row.try_get::<String, _>("status")?, row.try_get::<i64, _>("count")?);
        }
        Ok(counts)
    }

    async fn cleanup_completed(&self, ttl_days: i64) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - Duration::days(ttl_days);
        let result =
            sqlx::query("DELETE FROM jobs WHERE status = 'completed' AND completed_at < ?")
                .bind(cutoff.to_rfc3339())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn cleanup_failed(&self, ttl_days: i64) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - Duration::days(ttl_days);
        let result = sqlx::query("DELETE FROM jobs WHERE status = 'failed' AND completed_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn job_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Job, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = JobStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown job status `{status_raw}`")))?;
    let payload_raw: String = row.try_get("payload")?;
    let payload = serde_json::from_str(&payload_raw)
        .map_err(|error| RepositoryError::Decode(format!("bad job payload: {error}")))?;

    Ok(Job {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        job_type: row.try_get("job_type")?,
        payload,
        status,
        priority: row.try_get("priority")?,
        attempts: row.try_get("attempts")?,
        max_attempts: row.try_get("max_attempts")?,
        scheduled_at: parse_timestamp("scheduled_at", row.try_get("scheduled_at")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        started_at: parse_optional_timestamp("started_at", row.try_get("started_at")?)?,
        completed_at: parse_optional_timestamp("completed_at", row.try_get("completed_at")?)?,
        error_message: row.try_get("error_message")?,
    })
}
