use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use movely_core::Provider;

use super::{InboundRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInboundRepository {
    pool: DbPool,
}

impl SqlInboundRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InboundRepository for SqlInboundRepository {
    async fn seen_or_mark(
        &self,
        tenant_id: &str,
        provider: Provider,
        message_id: &str,
        chat_id: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO inbound_messages (tenant_id, provider, message_id, chat_id, received_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (tenant_id, provider, message_id) DO NOTHING",
        )
        .bind(tenant_id)
        .bind(provider.as_str())
        .bind(message_id)
        .bind(chat_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Zero rows inserted means the primary key already existed.
        Ok(result.rows_affected() == 0)
    }

    async fn delete_for_chat(
        &self,
        tenant_id: &str,
        provider: Provider,
        chat_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM inbound_messages WHERE tenant_id = ? AND provider = ? AND chat_id = ?",
        )
        .bind(tenant_id)
        .bind(provider.as_str())
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, tenant_id: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM inbound_messages WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
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
    async fn second_delivery_of_the_same_message_is_seen() {
        let pool = setup().await;
        let repo = SqlInboundRepository::new(pool.clone());

        let first =
            repo.seen_or_mark("t-1", Provider::Telegram, "msg-1", "chat-1").await.unwrap();
        let second =
            repo.seen_or_mark("t-1", Provider::Telegram, "msg-1", "chat-1").await.unwrap();

        assert!(!first);
        assert!(second);
        assert_eq!(repo.count("t-1").await.unwrap(), 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn same_message_id_on_another_provider_is_fresh() {
        let pool = setup().await;
        let repo = SqlInboundRepository::new(pool.clone());

        assert!(!repo.seen_or_mark("t-1", Provider::Telegram, "msg-1", "c").await.unwrap());
        assert!(!repo.seen_or_mark("t-1", Provider::Meta, "msg-1", "c").await.unwrap());
        assert!(!repo.seen_or_mark("t-2", Provider::Telegram, "msg-1", "c").await.unwrap());

        pool.close().await;
    }

    #[tokio::test]
    async fn delete_for_chat_clears_only_that_chat() {
        let pool = setup().await;
        let repo = SqlInboundRepository::new(pool.clone());

        repo.seen_or_mark("t-1", Provider::Twilio, "m-1", "chat-1").await.unwrap();
        repo.seen_or_mark("t-1", Provider::Twilio, "m-2", "chat-1").await.unwrap();
        repo.seen_or_mark("t-1", Provider::Twilio, "m-3", "chat-2").await.unwrap();

        let deleted = repo.delete_for_chat("t-1", Provider::Twilio, "chat-1").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.count("t-1").await.unwrap(), 1);

        pool.close().await;
    }
}
