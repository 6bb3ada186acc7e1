use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use movely_core::{MediaAsset, MediaKind};

use super::session::{parse_optional_timestamp, parse_timestamp};
use super::{MediaAssetRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMediaAssetRepository {
    pool: DbPool,
}

impl SqlMediaAssetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaAssetRepository for SqlMediaAssetRepository {
    async fn insert(&self, asset: &MediaAsset) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO media_assets (id, tenant_id, lead_id, chat_id, provider, kind, content_type, size_bytes, s3_key, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&asset.id)
        .bind(&asset.tenant_id)
        .bind(asset.lead_id.as_deref())
        .bind(&asset.chat_id)
        .bind(&asset.provider)
        .bind(asset.kind.as_str())
        .bind(&asset.content_type)
        .bind(asset.size_bytes)
        .bind(&asset.s3_key)
        .bind(asset.expires_at.map(|ts| ts.to_rfc3339()))
        .bind(asset.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_expired(&self, limit: i64) -> Result<Vec<MediaAsset>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM media_assets
             WHERE expires_at IS NOT NULL AND expires_at < ?
             ORDER BY expires_at ASC
             LIMIT ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(asset_from_row).collect()
    }

    async fn delete(&self, asset_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM media_assets WHERE id = ?")
            .bind(asset_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_lead(
        &self,
        tenant_id: &str,
        lead_id: &str,
    ) -> Result<Vec<MediaAsset>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM media_assets WHERE tenant_id = ? AND lead_id = ? ORDER BY created_at ASC",
        )
        .bind(tenant_id)
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(asset_from_row).collect()
    }
}

fn asset_from_row(row: sqlx::sqlite::SqliteRow) -> Result<MediaAsset, RepositoryError> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = MediaKind::parse(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown media kind `{kind_raw}`")))?;

    Ok(MediaAsset {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        lead_id: row.try_get("lead_id")?,
        chat_id: row.try_get("chat_id")?,
        provider: row.try_get("provider")?,
        kind,
        content_type: row.try_get("content_type")?,
        size_bytes: row.try_get("size_bytes")?,
        s3_key: row.try_get("s3_key")?,
        expires_at: parse_optional_timestamp("expires_at", row.try_get("expires_at")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
