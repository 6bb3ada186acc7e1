use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use movely_core::{job_types, Job, WorkerRole};
use movely_db::{
    IdempotencyLedger, LeadRepository, MediaAssetRepository, RepositoryError, SessionStore,
    TenantRegistry,
};

use crate::notification::NotificationSettings;
use crate::ports::{ChannelSender, DeliveryError, MediaFetcher, ObjectStore};
use crate::signing::MediaUrlSigner;

pub mod crew_fallback;
pub mod media_cleanup;
pub mod notify_operator;
pub mod outbound_reply;
pub mod process_media;
pub mod session_cleanup;

pub use crew_fallback::CrewFallbackHandler;
pub use media_cleanup::MediaCleanupHandler;
pub use notify_operator::NotifyOperatorHandler;
pub use outbound_reply::OutboundReplyHandler;
pub use process_media::ProcessMediaHandler;
pub use session_cleanup::SessionCleanupHandler;

#[derive(Clone, Debug, Error)]
pub enum HandlerError {
    /// The attempt failed but a retry may succeed.
    #[error("{0}")]
    Retryable(String),
    /// Retrying cannot help; the job goes straight to `failed`.
    #[error("{0}")]
    Permanent(String),
}

impl From<DeliveryError> for HandlerError {
    fn from(error: DeliveryError) -> Self {
        match error {
            DeliveryError::Transient(message) => Self::Retryable(message),
            DeliveryError::Permanent(message) => Self::Permanent(message),
        }
    }
}

impl From<RepositoryError> for HandlerError {
    fn from(error: RepositoryError) -> Self {
        Self::Retryable(error.to_string())
    }
}

impl From<movely_core::ApplicationError> for HandlerError {
    fn from(error: movely_core::ApplicationError) -> Self {
        use movely_core::ApplicationError;
        match &error {
            // A missing tenant or bad credentials will not fix themselves.
            ApplicationError::TenantNotResolved | ApplicationError::Crypto(_) => {
                Self::Permanent(error.to_string())
            }
            _ => Self::Retryable(error.to_string()),
        }
    }
}

/// One job type's executor. Handlers tolerate re-execution: the lease sweep
/// may hand a job that already ran to a second worker.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Everything the handlers need, injected once at process start.
pub struct HandlerDeps {
    pub registry: Arc<TenantRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub leads: Arc<dyn LeadRepository>,
    pub media: Arc<dyn MediaAssetRepository>,
    pub ledger: Arc<dyn IdempotencyLedger>,
    pub sender: Arc<dyn ChannelSender>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub store: Arc<dyn ObjectStore>,
    pub signer: Arc<MediaUrlSigner>,
    pub notification: NotificationSettings,
    pub media_ttl_days: i64,
    pub media_max_size_bytes: i64,
    pub session_ttl_seconds: i64,
    pub crew_fallback_enabled: bool,
}

/// Build the role-filtered handler map. `all` still registers the same
/// role-disjoint sets, so a split deployment runs identical codepaths.
pub fn build_handler_set(
    role: WorkerRole,
    deps: &HandlerDeps,
) -> HashMap<&'static str, Arc<dyn JobHandler>> {
    let mut handlers: HashMap<&'static str, Arc<dyn JobHandler>> = HashMap::new();

    for job_type in role.job_types() {
        let handler: Arc<dyn JobHandler> = match job_type {
            job_types::OUTBOUND_REPLY => Arc::new(OutboundReplyHandler::new(
                deps.registry.clone(),
                deps.sender.clone(),
                deps.ledger.clone(),
            )),
            job_types::PROCESS_MEDIA => Arc::new(ProcessMediaHandler::new(
                deps.registry.clone(),
                deps.fetcher.clone(),
                deps.store.clone(),
                deps.media.clone(),
                deps.media_ttl_days,
                deps.media_max_size_bytes,
            )),
            job_types::NOTIFY_OPERATOR => Arc::new(NotifyOperatorHandler::new(
                deps.registry.clone(),
                deps.leads.clone(),
                deps.media.clone(),
                deps.ledger.clone(),
                deps.sender.clone(),
                deps.signer.clone(),
                deps.notification.clone(),
            )),
            job_types::NOTIFY_CREW_FALLBACK => Arc::new(CrewFallbackHandler::new(
                deps.registry.clone(),
                deps.leads.clone(),
                deps.ledger.clone(),
                deps.sender.clone(),
                deps.notification.clone(),
                deps.crew_fallback_enabled,
            )),
            job_types::MEDIA_CLEANUP => {
                Arc::new(MediaCleanupHandler::new(deps.media.clone(), deps.store.clone()))
            }
            job_types::SESSION_CLEANUP => Arc::new(SessionCleanupHandler::new(
                deps.sessions.clone(),
                deps.session_ttl_seconds,
            )),
            _ => continue,
        };
        handlers.insert(job_type, handler);
    }

    handlers
}
