mod bootstrap;
mod crypto;
mod health;
mod ingress;
mod maintenance;
mod media_fetch;

use std::sync::Arc;

use anyhow::Result;
use movely_core::config::{LogFormat, ProcessRole};
use movely_core::{AppConfig, LoadOptions};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    // Logging comes up before anything that logs; the same options are then
    // handed to bootstrap for the authoritative load.
    let options = LoadOptions::default();
    let logging = AppConfig::load(options.clone())?.logging;
    init_tracing(&logging.level, logging.format);

    let cipher = Arc::new(crypto::HmacTagCipher::from_env()?);
    let app = bootstrap::bootstrap(options, cipher).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let role = app.config.server.role;

    let mut tasks = Vec::new();
    if matches!(role, ProcessRole::Worker | ProcessRole::All) {
        let worker = app.worker;
        let rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { worker.run(rx).await }));

        let jobs = app.jobs.clone();
        let rx = shutdown_rx.clone();
        let settings = maintenance::MaintenanceSettings {
            completed_retention_days: app.config.worker.completed_retention_days,
            failed_retention_days: app.config.worker.failed_retention_days,
        };
        tasks.push(tokio::spawn(async move {
            maintenance::run(jobs, settings, rx).await;
        }));
    }
    // In web and all roles the ingress service is driven by the provider
    // webhook adapters, which mount on the HTTP surface alongside /healthz.
    let _ = &app.ingress;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        role = ?role,
        "movely-server started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "movely-server stopping"
    );

    shutdown_tx.send(true).ok();
    for task in tasks {
        task.await.ok();
    }

    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
