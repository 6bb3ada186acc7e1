//! Periodic maintenance: enqueue the cleanup jobs and trim terminal queue
//! rows. Runs alongside the worker loop in worker-role processes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use movely_core::job_types;
use movely_db::{JobRepository, NewJob};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct MaintenanceSettings {
    pub completed_retention_days: i64,
    pub failed_retention_days: i64,
}

pub async fn run(
    jobs: Arc<dyn JobRepository>,
    settings: MaintenanceSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        for job_type in [job_types::MEDIA_CLEANUP, job_types::SESSION_CLEANUP] {
            if let Err(error) =
                jobs.enqueue(NewJob::new("system", job_type, serde_json::json!({}))).await
            {
                tracing::warn!(
                    event_name = "system.maintenance.enqueue_failed",
                    job_type,
                    error = %error,
                    "maintenance enqueue failed"
                );
            }
        }

        if let Err(error) = jobs.cleanup_completed(settings.completed_retention_days).await {
            tracing::warn!(
                event_name = "system.maintenance.retention_failed",
                error = %error,
                "completed-job retention failed"
            );
        }
        if let Err(error) = jobs.cleanup_failed(settings.failed_retention_days).await {
            tracing::warn!(
                event_name = "system.maintenance.retention_failed",
                error = %error,
                "failed-job retention failed"
            );
        }

        tokio::select! {
            _ = tokio::time::sleep(MAINTENANCE_INTERVAL) => {}
            _ = shutdown.changed() => {}
        }
    }
}
