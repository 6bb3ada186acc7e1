use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use movely_core::{Lead, LeadStatus};

use super::session::{parse_optional_timestamp, parse_timestamp};
use super::{LeadRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn insert_finalized(
        &self,
        tenant_id: &str,
        lead_id: &str,
        chat_id: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let payload_json = payload.to_string();

        // lead_seq is assigned inside the INSERT so the MAX+1 and the write
        // are one atomic statement. ON CONFLICT keeps replays to one row.
        let row = sqlx::query(
            "INSERT INTO leads (tenant_id, lead_id, chat_id, lead_seq, status, payload, created_at, updated_at)
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(lead_seq), 0) + 1 FROM leads), 'new', ?, ?, ?)
             ON CONFLICT (tenant_id, lead_id) DO NOTHING
             RETURNING lead_seq",
        )
        .bind(tenant_id)
        .bind(lead_id)
        .bind(chat_id)
        .bind(&payload_json)
        .bind(&now)
        .bind(&now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let seq: i64 = row.try_get("lead_seq")?;
            tracing::info!(
                event_name = "lead.created",
                tenant_id,
                lead_id,
                lead_seq = seq,
                "lead persisted"
            );
            return Ok(seq);
        }

        // Replay: the lead is already there, hand back its sequence.
        let existing = sqlx::query("SELECT lead_seq FROM leads WHERE tenant_id = ? AND lead_id = ?")
            .bind(tenant_id)
            .bind(lead_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(existing.try_get("lead_seq")?)
    }

    async fn update_payload(
        &self,
        tenant_id: &str,
        lead_id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE leads SET payload = ?, updated_at = ? WHERE tenant_id = ? AND lead_id = ?",
        )
        .bind(payload.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(tenant_id)
        .bind(lead_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        tenant_id: &str,
        lead_id: &str,
    ) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(
            "SELECT tenant_id, lead_id, chat_id, lead_seq, status, payload, created_at, updated_at, deleted_at
             FROM leads WHERE tenant_id = ? AND lead_id = ?",
        )
        .bind(tenant_id)
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(lead_from_row).transpose()
    }

    async fn count(&self, tenant_id: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM leads WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }
}

fn lead_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Lead, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = LeadStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown lead status `{status_raw}`")))?;
    let payload_raw: String = row.try_get("payload")?;
    let payload = serde_json::from_str(&payload_raw)
        .map_err(|error| RepositoryError::Decode(format!("bad lead payload: {error}")))?;

    Ok(Lead {
        tenant_id: row.try_get("tenant_id")?,
        lead_id: row.try_get("lead_id")?,
        chat_id: row.try_get("chat_id")?,
        lead_seq: row.try_get("lead_seq")?,
        status,
        payload,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        deleted_at: parse_optional_timestamp("deleted_at", row.try_get("deleted_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    async fn lead_seq_is_monotonic_across_tenants() {
        let pool = setup().await;
        let repo = SqlLeadRepository::new(pool.clone());

        let payload = serde_json::json!({"language": "ru"});
        let first = repo.insert_finalized("t-1", "aaa111", "chat-1", &payload).await.unwrap();
        let second = repo.insert_finalized("t-2", "bbb222", "chat-2", &payload).await.unwrap();
        let third = repo.insert_finalized("t-1", "ccc333", "chat-3", &payload).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(third, 3);

        pool.close().await;
    }

    #[tokio::test]
    async fn replayed_insert_returns_the_same_seq_without_a_second_row() {
        let pool = setup().await;
        let repo = SqlLeadRepository::new(pool.clone());

        let payload = serde_json::json!({"language": "en"});
        let first = repo.insert_finalized("t-1", "dup111", "chat-1", &payload).await.unwrap();
        let replay = repo.insert_finalized("t-1", "dup111", "chat-1", &payload).await.unwrap();

        assert_eq!(first, replay);
        assert_eq!(repo.count("t-1").await.unwrap(), 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn find_round_trips_the_payload() {
        let pool = setup().await;
        let repo = SqlLeadRepository::new(pool.clone());

        let payload = serde_json::json!({"lead_number": 1, "language": "he"});
        repo.insert_finalized("t-1", "abc123", "chat-9", &payload).await.unwrap();

        let lead = repo.find("t-1", "abc123").await.unwrap().expect("present");
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.payload, payload);
        assert_eq!(lead.chat_id, "chat-9");
        assert!(lead.deleted_at.is_none());

        assert!(repo.find("t-1", "zzz999").await.unwrap().is_none());

        pool.close().await;
    }
}
