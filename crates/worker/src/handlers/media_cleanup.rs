use async_trait::async_trait;
use std::sync::Arc;

use movely_core::Job;
use movely_db::MediaAssetRepository;

use super::{HandlerError, JobHandler};
use crate::ports::ObjectStore;

/// Delete expired media: the object first, then the row, so a crash leaves
/// at worst a row pointing at nothing, which the next run retries.
pub struct MediaCleanupHandler {
    media: Arc<dyn MediaAssetRepository>,
    store: Arc<dyn ObjectStore>,
}

const CLEANUP_BATCH: i64 = 100;

impl MediaCleanupHandler {
    pub fn new(media: Arc<dyn MediaAssetRepository>, store: Arc<dyn ObjectStore>) -> Self {
        Self { media, store }
    }
}

#[async_trait]
impl JobHandler for MediaCleanupHandler {
    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let expired = self.media.list_expired(CLEANUP_BATCH).await?;
        let total = expired.len();

        for asset in expired {
            self.store.delete(&asset.s3_key).await?;
            self.media.delete(&asset.id).await?;
        }

        if total > 0 {
            tracing::info!(
                event_name = "job.media_cleanup.done",
                job_id = %job.id,
                deleted = total,
                "expired media removed"
            );
        }
        Ok(())
    }
}
