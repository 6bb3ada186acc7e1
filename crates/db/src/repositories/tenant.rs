use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use movely_core::{ChannelBinding, Provider, TenantConfig};

use super::RepositoryError;
use crate::DbPool;

#[derive(Clone, Debug, PartialEq)]
pub struct TenantRow {
    pub id: String,
    pub display_name: String,
    pub is_active: bool,
    pub config: TenantConfig,
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn load_active(&self) -> Result<Vec<(TenantRow, Vec<ChannelBinding>)>, RepositoryError>;

    async fn upsert_tenant(&self, tenant: &TenantRow) -> Result<(), RepositoryError>;

    async fn upsert_binding(&self, binding: &ChannelBinding) -> Result<(), RepositoryError>;
}

pub struct SqlTenantRepository {
    pool: DbPool,
}

impl SqlTenantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for SqlTenantRepository {
    async fn load_active(&self) -> Result<Vec<(TenantRow, Vec<ChannelBinding>)>, RepositoryError> {
        let tenant_rows = sqlx::query(
            "SELECT id, display_name, is_active, config_json FROM tenants WHERE is_active = 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let binding_rows = sqlx::query(
            "SELECT cb.tenant_id, cb.provider, cb.provider_account_id,
                    cb.credentials_enc, cb.config_json, cb.is_active
             FROM channel_bindings cb
             JOIN tenants t ON t.id = cb.tenant_id
             WHERE cb.is_active = 1 AND t.is_active = 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut bindings: Vec<ChannelBinding> = Vec::with_capacity(binding_rows.len());
        for row in binding_rows {
            let provider_raw: String = row.try_get("provider")?;
            let provider = Provider::parse(&provider_raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown provider `{provider_raw}`"))
            })?;
            let config_raw: String = row.try_get("config_json")?;
            let config: TenantConfig = serde_json::from_str(&config_raw)
                .map_err(|error| RepositoryError::Decode(format!("bad binding config: {error}")))?;

            bindings.push(ChannelBinding {
                tenant_id: row.try_get("tenant_id")?,
                provider,
                provider_account_id: row.try_get("provider_account_id")?,
                credentials_enc: row.try_get("credentials_enc")?,
                config,
                is_active: row.try_get::<i64, _>("is_active")? != 0,
            });
        }

        let mut result = Vec::with_capacity(tenant_rows.len());
        for row in tenant_rows {
            let id: String = row.try_get("id")?;
            let config_raw: String = row.try_get("config_json")?;
            let config: TenantConfig = serde_json::from_str(&config_raw)
                .map_err(|error| RepositoryError::Decode(format!("bad tenant config: {error}")))?;
            let tenant = TenantRow {
                id: id.clone(),
                display_name: row.try_get("display_name")?,
                is_active: row.try_get::<i64, _>("is_active")? != 0,
                config,
            };
            let tenant_bindings =
                bindings.iter().filter(|b| b.tenant_id == id).cloned().collect();
            result.push((tenant, tenant_bindings));
        }
        Ok(result)
    }

    async fn upsert_tenant(&self, tenant: &TenantRow) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO tenants (id, display_name, is_active, config_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                display_name = excluded.display_name,
                is_active = excluded.is_active,
                config_json = excluded.config_json,
                updated_at = excluded.updated_at",
        )
        .bind(&tenant.id)
        .bind(&tenant.display_name)
        .bind(i64::from(tenant.is_active))
        .bind(tenant.config.0.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_binding(&self, binding: &ChannelBinding) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO channel_bindings (tenant_id, provider, provider_account_id, credentials_enc, config_json, is_active)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (tenant_id, provider) DO UPDATE SET
                provider_account_id = excluded.provider_account_id,
                credentials_enc = excluded.credentials_enc,
                config_json = excluded.config_json,
                is_active = excluded.is_active",
        )
        .bind(&binding.tenant_id)
        .bind(binding.provider.as_str())
        .bind(&binding.provider_account_id)
        .bind(&binding.credentials_enc)
        .bind(binding.config.0.to_string())
        .bind(i64::from(binding.is_active))
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

    fn tenant(id: &str) -> TenantRow {
        TenantRow {
            id: id.to_string(),
            display_name: format!("Tenant {id}"),
            is_active: true,
            config: TenantConfig(serde_json::json!({"operator_chat_id": "op-1"})),
        }
    }

    fn binding(tenant_id: &str, account: &str) -> ChannelBinding {
        ChannelBinding {
            tenant_id: tenant_id.to_string(),
            provider: Provider::Telegram,
            provider_account_id: account.to_string(),
            credentials_enc: vec![1, 2, 3],
            config: TenantConfig::default(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn load_active_joins_tenants_and_bindings() {
        let pool = setup().await;
        let repo = SqlTenantRepository::new(pool.clone());

        repo.upsert_tenant(&tenant("t-1")).await.unwrap();
        repo.upsert_binding(&binding("t-1", "bot-100")).await.unwrap();

        let loaded = repo.load_active().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let (row, bindings) = &loaded[0];
        assert_eq!(row.id, "t-1");
        assert_eq!(row.config.operator_chat_id(), Some("op-1"));
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].provider_account_id, "bot-100");

        pool.close().await;
    }

    #[tokio::test]
    async fn inactive_tenants_are_excluded() {
        let pool = setup().await;
        let repo = SqlTenantRepository::new(pool.clone());

        let mut inactive = tenant("t-2");
        inactive.is_active = false;
        repo.upsert_tenant(&inactive).await.unwrap();

        assert!(repo.load_active().await.unwrap().is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn provider_account_uniqueness_is_enforced_among_active_bindings() {
        let pool = setup().await;
        let repo = SqlTenantRepository::new(pool.clone());

        repo.upsert_tenant(&tenant("t-1")).await.unwrap();
        repo.upsert_tenant(&tenant("t-2")).await.unwrap();
        repo.upsert_binding(&binding("t-1", "bot-100")).await.unwrap();

        // Same provider identity on another tenant must be rejected.
        let error = repo.upsert_binding(&binding("t-2", "bot-100")).await;
        assert!(error.is_err());

        pool.close().await;
    }
}
