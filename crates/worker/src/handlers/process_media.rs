use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use movely_core::{media_object_key, InboundMedia, Job, MediaAsset, MediaKind, Provider};
use movely_db::{MediaAssetRepository, TenantRegistry};

use super::{HandlerError, JobHandler};
use crate::ports::{MediaFetcher, ObjectStore};

#[derive(Debug, Deserialize)]
struct ProcessMediaPayload {
    provider: String,
    chat_id: String,
    /// Lead association comes from the job payload, never from the session:
    /// the session may already be finalized and gone by the time this runs.
    #[serde(default)]
    lead_id: Option<String>,
    #[serde(default)]
    message_id: String,
    items: Vec<InboundMedia>,
}

/// Download, validate and store inbound attachments, one `media_asset` row
/// per stored object.
pub struct ProcessMediaHandler {
    registry: Arc<TenantRegistry>,
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaAssetRepository>,
    ttl_days: i64,
    max_size_bytes: i64,
}

impl ProcessMediaHandler {
    pub fn new(
        registry: Arc<TenantRegistry>,
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaAssetRepository>,
        ttl_days: i64,
        max_size_bytes: i64,
    ) -> Self {
        Self { registry, fetcher, store, media, ttl_days, max_size_bytes }
    }
}

#[async_trait]
impl JobHandler for ProcessMediaHandler {
    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let payload: ProcessMediaPayload = serde_json::from_value(job.payload.clone())
            .map_err(|error| HandlerError::Permanent(format!("bad payload: {error}")))?;
        let provider = Provider::parse(&payload.provider).ok_or_else(|| {
            HandlerError::Permanent(format!("unknown provider `{}`", payload.provider))
        })?;

        let binding = self.registry.binding_for(&job.tenant_id, provider).await?;
        let credentials = self.registry.open_credentials(&binding)?;

        for item in &payload.items {
            let Some(kind) = MediaKind::from_content_type(&item.content_type) else {
                tracing::warn!(
                    event_name = "job.process_media.unsupported_type",
                    job_id = %job.id,
                    content_type = %item.content_type,
                    "attachment skipped"
                );
                continue;
            };
            if item.size_bytes > self.max_size_bytes {
                tracing::warn!(
                    event_name = "job.process_media.oversized",
                    job_id = %job.id,
                    size_bytes = item.size_bytes,
                    "attachment skipped"
                );
                continue;
            }

            let fetched = self.fetcher.fetch(provider, &credentials, &item.source_ref).await?;
            let asset_id = Uuid::new_v4().to_string();
            let extension = kind.extension(&fetched.content_type);
            let key =
                media_object_key(&job.tenant_id, payload.lead_id.as_deref(), &asset_id, extension);

            self.store.put(&key, fetched.bytes.clone(), &fetched.content_type).await?;

            let now = Utc::now();
            self.media
                .insert(&MediaAsset {
                    id: asset_id.clone(),
                    tenant_id: job.tenant_id.clone(),
                    lead_id: payload.lead_id.clone(),
                    chat_id: payload.chat_id.clone(),
                    provider: payload.provider.clone(),
                    kind,
                    content_type: fetched.content_type.clone(),
                    size_bytes: fetched.bytes.len() as i64,
                    s3_key: key,
                    expires_at: Some(now + Duration::days(self.ttl_days)),
                    created_at: now,
                })
                .await?;

            tracing::info!(
                event_name = "job.process_media.stored",
                job_id = %job.id,
                asset_id = %asset_id,
                kind = kind.as_str(),
                message_id = %payload.message_id,
                "attachment stored"
            );
        }

        Ok(())
    }
}
