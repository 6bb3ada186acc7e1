use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use movely_core::SessionState;

use super::{RepositoryError, SessionStore};
use crate::DbPool;

pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn get(
        &self,
        tenant_id: &str,
        chat_id: &str,
    ) -> Result<Option<SessionState>, RepositoryError> {
        let row = sqlx::query(
            "SELECT state_json, updated_at FROM sessions WHERE tenant_id = ? AND chat_id = ?",
        )
        .bind(tenant_id)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.try_get("state_json")?;
        let mut state: SessionState = serde_json::from_str(&state_json)
            .map_err(|error| RepositoryError::Decode(format!("bad session state: {error}")))?;
        // The row's timestamp is authoritative: it is the optimistic token.
        state.updated_at = parse_timestamp("updated_at", row.try_get("updated_at")?)?;
        Ok(Some(state))
    }

    async fn upsert(
        &self,
        state: &SessionState,
        observed: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let state_json = serde_json::to_string(state)
            .map_err(|error| RepositoryError::Decode(format!("serialize session: {error}")))?;
        let now = Utc::now();

        let result = match observed {
            None => {
                sqlx::query(
                    "INSERT INTO sessions (tenant_id, chat_id, state_json, step, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)
                     ON CONFLICT (tenant_id, chat_id) DO NOTHING",
                )
                .bind(&state.tenant_id)
                .bind(&state.chat_id)
                .bind(&state_json)
                .bind(state.step.as_str())
                .bind(state.created_at.to_rfc3339())
                .bind(now.to_rfc3339())
                .execute(&self.pool)
                .await?
            }
            Some(observed) => {
                sqlx::query(
                    "UPDATE sessions
                     SET state_json = ?, step = ?, updated_at = ?
                     WHERE tenant_id = ? AND chat_id = ? AND updated_at = ?",
                )
                .bind(&state_json)
                .bind(state.step.as_str())
                .bind(now.to_rfc3339())
                .bind(&state.tenant_id)
                .bind(&state.chat_id)
                .bind(observed.to_rfc3339())
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict);
        }
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, chat_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE tenant_id = ? AND chat_id = ?")
            .bind(tenant_id)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cleanup_expired(&self, ttl_seconds: i64) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - Duration::seconds(ttl_seconds);
        let result = sqlx::query("DELETE FROM sessions WHERE updated_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(
                event_name = "session.cleanup",
                deleted,
                ttl_seconds,
                "expired sessions removed"
            );
        }
        Ok(deleted)
    }
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|ts| ts.with_timezone(&Utc)).map_err(|error| {
        RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|ts| parse_timestamp(column, ts)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};
    use movely_core::{Language, Step};

    async fn setup() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample_state() -> SessionState {
        SessionState::new("t-1", "chat-1", Language::Ru, Utc::now())
    }

    #[tokio::test]
    async fn insert_get_delete_round_trip() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool.clone());
        let state = sample_state();

        store.upsert(&state, None).await.expect("insert");

        let loaded = store.get("t-1", "chat-1").await.expect("get").expect("present");
        assert_eq!(loaded.lead_id, state.lead_id);
        assert_eq!(loaded.step, Step::Welcome);

        store.delete("t-1", "chat-1").await.expect("delete");
        assert!(store.get("t-1", "chat-1").await.expect("get").is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn double_insert_conflicts() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool.clone());
        let state = sample_state();

        store.upsert(&state, None).await.expect("first insert");
        let error = store.upsert(&state, None).await.expect_err("second insert must conflict");
        assert!(matches!(error, RepositoryError::Conflict));

        pool.close().await;
    }

    #[tokio::test]
    async fn stale_observed_timestamp_conflicts() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool.clone());
        let state = sample_state();
        store.upsert(&state, None).await.expect("insert");

        let loaded = store.get("t-1", "chat-1").await.expect("get").expect("present");
        let mut updated = loaded.clone();
        updated.step = Step::Cargo;
        store.upsert(&updated, Some(loaded.updated_at)).await.expect("guarded update");

        // A second writer still holding the old timestamp loses.
        let mut racer = loaded.clone();
        racer.step = Step::Volume;
        let error = store
            .upsert(&racer, Some(loaded.updated_at))
            .await
            .expect_err("stale write must conflict");
        assert!(matches!(error, RepositoryError::Conflict));

        let final_state = store.get("t-1", "chat-1").await.expect("get").expect("present");
        assert_eq!(final_state.step, Step::Cargo);

        pool.close().await;
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_rows() {
        let pool = setup().await;
        let store = SqlSessionStore::new(pool.clone());
        let state = sample_state();
        store.upsert(&state, None).await.expect("insert");

        // A generous TTL keeps the fresh session.
        let deleted = store.cleanup_expired(3600).await.expect("cleanup");
        assert_eq!(deleted, 0);

        // Backdate the row, then sweep.
        sqlx::query("UPDATE sessions SET updated_at = ?")
            .bind((Utc::now() - Duration::seconds(7200)).to_rfc3339())
            .execute(&pool)
            .await
            .expect("backdate");
        let deleted = store.cleanup_expired(3600).await.expect("cleanup");
        assert_eq!(deleted, 1);

        pool.close().await;
    }
}
