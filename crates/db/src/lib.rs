pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod tenant_registry;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    IdempotencyLedger, InboundRepository, JobRepository, LeadRepository, MediaAssetRepository,
    NewJob, RepositoryError, SessionStore, SqlIdempotencyLedger, SqlInboundRepository,
    SqlJobRepository, SqlLeadRepository, SqlMediaAssetRepository, SqlSessionStore,
    SqlTenantRepository, TenantRepository, TenantRow,
};
pub use tenant_registry::TenantRegistry;
