use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::{IdempotencyLedger, RepositoryError};
use crate::DbPool;

pub struct SqlIdempotencyLedger {
    pool: DbPool,
}

impl SqlIdempotencyLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyLedger for SqlIdempotencyLedger {
    async fn reserve(&self, operation_key: &str) -> Result<bool, RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO idempotency_ledger (operation_key, state, first_seen_at, last_seen_at)
             VALUES (?, 'reserved', ?, ?)
             ON CONFLICT (operation_key) DO UPDATE SET last_seen_at = excluded.last_seen_at",
        )
        .bind(operation_key)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT state FROM idempotency_ledger WHERE operation_key = ?")
            .bind(operation_key)
            .fetch_one(&self.pool)
            .await?;
        let state: String = row.try_get("state")?;

        // `reserved` from a crashed earlier run means the handler reruns;
        // only a recorded completion makes this a no-op.
        Ok(state == "completed")
    }

    async fn mark_completed(&self, operation_key: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE idempotency_ledger SET state = 'completed', last_seen_at = ? WHERE operation_key = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(operation_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
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
    async fn completed_key_short_circuits_later_reservations() {
        let pool = setup().await;
        let ledger = SqlIdempotencyLedger::new(pool.clone());

        assert!(!ledger.reserve("lead-1:notify_operator_v1").await.unwrap());
        ledger.mark_completed("lead-1:notify_operator_v1").await.unwrap();
        assert!(ledger.reserve("lead-1:notify_operator_v1").await.unwrap());

        pool.close().await;
    }

    #[tokio::test]
    async fn reserved_but_unfinished_key_allows_rerun() {
        let pool = setup().await;
        let ledger = SqlIdempotencyLedger::new(pool.clone());

        assert!(!ledger.reserve("lead-2:crew_fallback_v1").await.unwrap());
        // Handler crashed before completing; the retry reruns the effect.
        assert!(!ledger.reserve("lead-2:crew_fallback_v1").await.unwrap());

        pool.close().await;
    }
}
