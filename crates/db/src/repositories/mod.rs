use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use movely_core::{Job, Lead, MediaAsset, Provider, SessionState};

pub mod inbound;
pub mod job;
pub mod lead;
pub mod ledger;
pub mod media_asset;
pub mod session;
pub mod tenant;

pub use inbound::SqlInboundRepository;
pub use job::{NewJob, SqlJobRepository};
pub use lead::SqlLeadRepository;
pub use ledger::SqlIdempotencyLedger;
pub use media_asset::SqlMediaAssetRepository;
pub use session::SqlSessionStore;
pub use tenant::{SqlTenantRepository, TenantRepository, TenantRow};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// Optimistic guard tripped: the row changed between read and write.
    #[error("write conflict")]
    Conflict,
}

/// One mutable conversation per `(tenant_id, chat_id)`. Writes carry the
/// `updated_at` observed at read time; a mismatch means a concurrent
/// message won the race and this one must be retried by the provider.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(
        &self,
        tenant_id: &str,
        chat_id: &str,
    ) -> Result<Option<SessionState>, RepositoryError>;

    /// Insert a session that must not exist yet, or replace one whose
    /// `updated_at` still equals `observed`.
    async fn upsert(
        &self,
        state: &SessionState,
        observed: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, tenant_id: &str, chat_id: &str) -> Result<(), RepositoryError>;

    async fn cleanup_expired(&self, ttl_seconds: i64) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Persist a finalized lead, assigning the next `lead_seq`. Re-insertion
    /// of the same `(tenant_id, lead_id)` returns the existing sequence
    /// without a second row.
    async fn insert_finalized(
        &self,
        tenant_id: &str,
        lead_id: &str,
        chat_id: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, RepositoryError>;

    /// Replace the payload after `lead_seq` is known (the snapshot embeds
    /// its own `lead_number`).
    async fn update_payload(
        &self,
        tenant_id: &str,
        lead_id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError>;

    async fn find(&self, tenant_id: &str, lead_id: &str)
        -> Result<Option<Lead>, RepositoryError>;

    async fn count(&self, tenant_id: &str) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait InboundRepository: Send + Sync {
    /// Record `(tenant, provider, message_id)`; returns `true` when the
    /// tuple was already present — the caller short-circuits.
    async fn seen_or_mark(
        &self,
        tenant_id: &str,
        provider: Provider,
        message_id: &str,
        chat_id: &str,
    ) -> Result<bool, RepositoryError>;

    async fn delete_for_chat(
        &self,
        tenant_id: &str,
        provider: Provider,
        chat_id: &str,
    ) -> Result<u64, RepositoryError>;

    async fn count(&self, tenant_id: &str) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn enqueue(&self, job: NewJob) -> Result<String, RepositoryError>;

    /// Claim the next due pending job whose type is in `job_types`:
    /// `pending → running` plus an attempts bump, atomically.
    async fn claim_one(&self, job_types: &[&str]) -> Result<Option<Job>, RepositoryError>;

    async fn complete(&self, job_id: &str) -> Result<(), RepositoryError>;

    /// Record a failure. `retry_at` is honored while attempts remain;
    /// otherwise the job lands in `failed`.
    async fn fail(
        &self,
        job_id: &str,
        error_message: &str,
        retry_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Terminal failure regardless of remaining attempts (non-retryable
    /// provider errors).
    async fn fail_permanent(&self, job_id: &str, error_message: &str)
        -> Result<(), RepositoryError>;

    /// Reset jobs stuck in `running` past the lease horizon.
    async fn reset_stale_running(&self, lease_timeout_secs: i64) -> Result<u64, RepositoryError>;

    async fn get(&self, job_id: &str) -> Result<Option<Job>, RepositoryError>;

    async fn count_by_status(&self) -> Result<BTreeMap<String, i64>, RepositoryError>;

    async fn cleanup_completed(&self, ttl_days: i64) -> Result<u64, RepositoryError>;

    async fn cleanup_failed(&self, ttl_days: i64) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait MediaAssetRepository: Send + Sync {
    async fn insert(&self, asset: &MediaAsset) -> Result<(), RepositoryError>;

    async fn list_expired(&self, limit: i64) -> Result<Vec<MediaAsset>, RepositoryError>;

    async fn delete(&self, asset_id: &str) -> Result<(), RepositoryError>;

    async fn list_for_lead(
        &self,
        tenant_id: &str,
        lead_id: &str,
    ) -> Result<Vec<MediaAsset>, RepositoryError>;
}

/// Side-effect ledger for job handlers. A key that reaches `completed`
/// makes every later execution with the same key a no-op.
#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    /// Reserve the key. Returns `true` when the side effect already
    /// completed and must not run again.
    async fn reserve(&self, operation_key: &str) -> Result<bool, RepositoryError>;

    async fn mark_completed(&self, operation_key: &str) -> Result<(), RepositoryError>;
}
