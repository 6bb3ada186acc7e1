use async_trait::async_trait;
use std::sync::Arc;

use movely_core::Job;
use movely_db::SessionStore;

use super::{HandlerError, JobHandler};

/// Drop session rows idle beyond the TTL.
pub struct SessionCleanupHandler {
    sessions: Arc<dyn SessionStore>,
    ttl_seconds: i64,
}

impl SessionCleanupHandler {
    pub fn new(sessions: Arc<dyn SessionStore>, ttl_seconds: i64) -> Self {
        Self { sessions, ttl_seconds }
    }
}

#[async_trait]
impl JobHandler for SessionCleanupHandler {
    async fn execute(&self, _job: &Job) -> Result<(), HandlerError> {
        self.sessions.cleanup_expired(self.ttl_seconds).await?;
        Ok(())
    }
}
