use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use movely_core::{
    build_engine, AppConfig, ApplicationError, ConfigError, CredentialCipher, LoadOptions,
    MovingBotEngine, PricingSettings,
};
use movely_db::{
    connect_with_settings, migrations, DbPool, SqlIdempotencyLedger, SqlInboundRepository,
    SqlJobRepository, SqlLeadRepository, SqlMediaAssetRepository, SqlSessionStore,
    SqlTenantRepository, TenantRegistry,
};
use movely_worker::{
    build_handler_set, HandlerDeps, HttpChannelSender, JobWorker, MediaUrlSigner,
    NotificationSettings, WorkerSettings,
};

use crate::ingress::{IngressConfig, IngressService};

// Tenant cache refreshes every few minutes; admin invalidation forces it.
const REGISTRY_TTL_SECS: i64 = 300;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub registry: Arc<TenantRegistry>,
    pub engine: Arc<MovingBotEngine>,
    pub ingress: Arc<IngressService>,
    pub worker: JobWorker,
    pub jobs: Arc<SqlJobRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("channel sender init failed: {0}")]
    Sender(String),
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

pub async fn bootstrap(
    options: LoadOptions,
    cipher: Arc<dyn CredentialCipher>,
) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting bootstrap");
    let config = AppConfig::load(options)?;

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let tenants = Arc::new(SqlTenantRepository::new(db_pool.clone()));
    let registry = Arc::new(TenantRegistry::new(tenants, cipher, REGISTRY_TTL_SECS));

    let sessions = Arc::new(SqlSessionStore::new(db_pool.clone()));
    let leads = Arc::new(SqlLeadRepository::new(db_pool.clone()));
    let inbound = Arc::new(SqlInboundRepository::new(db_pool.clone()));
    let jobs = Arc::new(SqlJobRepository::new(db_pool.clone()));
    let media = Arc::new(SqlMediaAssetRepository::new(db_pool.clone()));
    let ledger = Arc::new(SqlIdempotencyLedger::new(db_pool.clone()));

    let engine = Arc::new(build_engine(
        &config.enabled_bots,
        PricingSettings::default(),
        config.estimate.display_enabled,
    )?);

    let ingress = Arc::new(IngressService::new(
        engine.clone(),
        registry.clone(),
        sessions.clone(),
        leads.clone(),
        inbound,
        jobs.clone(),
        IngressConfig {
            session_ttl_seconds: config.session.ttl_seconds,
            session_stale_hint_seconds: config.session.stale_hint_seconds,
            crew_fallback_enabled: config.dispatch.crew_fallback_enabled,
            crew_fallback_delay_secs: config.dispatch.crew_fallback_delay_secs,
        },
    ));

    let signer = Arc::new(MediaUrlSigner::new(
        config.media.signing_secret.clone(),
        config.media.delivery_base_url.clone(),
    ));
    let sender = Arc::new(
        HttpChannelSender::new().map_err(|error| BootstrapError::Sender(error.to_string()))?,
    );
    let fetcher = Arc::new(
        crate::media_fetch::HttpMediaFetcher::new()
            .map_err(|error| BootstrapError::Sender(error.to_string()))?,
    );
    let store = Arc::new(crate::media_fetch::FsObjectStore::new("data/media"));

    let deps = HandlerDeps {
        registry: registry.clone(),
        sessions,
        leads,
        media,
        ledger,
        sender,
        fetcher,
        store,
        signer,
        notification: NotificationSettings {
            target_lang: config.operator.lead_target_lang,
            translation_enabled: config.operator.lead_translation_enabled,
            max_inline_media_count: config.media.max_inline_media_count,
            link_ttl_secs: config.media.link_ttl_secs,
        },
        media_ttl_days: config.media.ttl_days,
        media_max_size_bytes: config.media.max_size_bytes,
        session_ttl_seconds: config.session.ttl_seconds,
        crew_fallback_enabled: config.dispatch.crew_fallback_enabled,
    };
    let handlers = build_handler_set(config.worker.role, &deps);
    let worker = JobWorker::new(
        jobs.clone(),
        handlers,
        WorkerSettings {
            role: config.worker.role,
            poll_interval: std::time::Duration::from_millis(config.worker.poll_interval_ms),
            lease_timeout_secs: config.worker.lease_timeout_secs,
            base_backoff_secs: config.worker.base_backoff_secs,
            max_backoff_secs: config.worker.max_backoff_secs,
        },
    );

    Ok(Application { config, db_pool, registry, engine, ingress, worker, jobs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HmacTagCipher;
    use movely_core::ConfigOverrides;

    #[tokio::test]
    async fn bootstrap_wires_the_full_stack() {
        // A file-backed database: the pool opens several connections and
        // they must all see the same schema.
        let dir = tempfile::TempDir::new().expect("tempdir");
        let db_path = dir.path().join("movely-test.db");
        let cipher = Arc::new(HmacTagCipher::new("boot-key".to_string().into()).unwrap());
        let app = bootstrap(
            LoadOptions {
                overrides: ConfigOverrides {
                    database_url: Some(format!("sqlite://{}?mode=rwc", db_path.display())),
                    media_signing_secret: Some("sig-secret".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            },
            cipher,
        )
        .await
        .expect("bootstrap succeeds");

        // Migrations applied: the queue answers.
        let counts = {
            use movely_db::JobRepository as _;
            app.jobs.count_by_status().await.expect("queue reachable")
        };
        assert!(counts.is_empty());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_without_a_signing_secret() {
        std::env::remove_var("MOVELY_MEDIA_SIGNING_SECRET");
        let cipher = Arc::new(HmacTagCipher::new("boot-key".to_string().into()).unwrap());
        let result = bootstrap(
            LoadOptions {
                overrides: ConfigOverrides {
                    database_url: Some("sqlite::memory:".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            },
            cipher,
        )
        .await;

        assert!(matches!(result, Err(BootstrapError::Config(_))));
    }
}
