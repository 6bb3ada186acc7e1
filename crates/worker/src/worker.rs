//! Polling job worker: claim → execute → mark, one job at a time per loop.
//!
//! The claim query only sees the job types this worker's role registered,
//! so out-of-role jobs stay `pending` for a process that owns them. Failed
//! attempts back off exponentially with jitter; rows stuck in `running`
//! past the lease horizon are periodically swept back to `pending`.

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use movely_core::{Job, WorkerRole};
use movely_db::JobRepository;

use crate::handlers::{HandlerError, JobHandler};

#[derive(Clone, Debug)]
pub struct WorkerSettings {
    pub role: WorkerRole,
    pub poll_interval: Duration,
    pub lease_timeout_secs: i64,
    pub base_backoff_secs: i64,
    pub max_backoff_secs: i64,
}

pub struct JobWorker {
    repo: Arc<dyn JobRepository>,
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
    settings: WorkerSettings,
    worker_id: String,
    /// Claimable types, derived once from the registered handlers.
    claim_types: Vec<&'static str>,
}

// Sweep stale leases roughly once a minute at the default poll interval.
const SWEEP_EVERY_LOOPS: u64 = 240;

impl JobWorker {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
        settings: WorkerSettings,
    ) -> Self {
        let mut claim_types: Vec<&'static str> = handlers.keys().copied().collect();
        claim_types.sort_unstable();
        let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        Self { repo, handlers, settings, worker_id, claim_types }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Run until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            event_name = "worker.started",
            worker_id = %self.worker_id,
            role = self.settings.role.as_str(),
            handlers = ?self.claim_types,
            "job worker started"
        );

        let mut loops: u64 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }
            loops += 1;

            if loops % SWEEP_EVERY_LOOPS == 0 {
                if let Err(error) =
                    self.repo.reset_stale_running(self.settings.lease_timeout_secs).await
                {
                    tracing::warn!(
                        event_name = "worker.sweep_failed",
                        worker_id = %self.worker_id,
                        error = %error,
                        "stale lease sweep failed"
                    );
                }
            }

            match self.run_once().await {
                Ok(true) => {
                    // Work found: loop immediately, more may be due.
                }
                Ok(false) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(error) => {
                    tracing::error!(
                        event_name = "worker.loop_error",
                        worker_id = %self.worker_id,
                        error = %error,
                        "worker loop error"
                    );
                    tokio::time::sleep(self.settings.poll_interval * 2).await;
                }
            }
        }

        tracing::info!(
            event_name = "worker.stopped",
            worker_id = %self.worker_id,
            "job worker stopped"
        );
    }

    /// Claim and execute at most one job. Returns whether a job was found.
    pub async fn run_once(&self) -> Result<bool, movely_db::RepositoryError> {
        let Some(job) = self.repo.claim_one(&self.claim_types).await? else {
            return Ok(false);
        };
        self.execute(&job).await?;
        Ok(true)
    }

    async fn execute(&self, job: &Job) -> Result<(), movely_db::RepositoryError> {
        let Some(handler) = self.handlers.get(job.job_type.as_str()) else {
            // Unreachable through the filtered claim, but a handler map and
            // claim list can only drift apart through a bug.
            tracing::error!(
                event_name = "worker.unknown_job_type",
                worker_id = %self.worker_id,
                job_id = %job.id,
                job_type = %job.job_type,
                "claimed a job without a handler"
            );
            self.repo
                .fail(&job.id, "no handler registered", Utc::now() + ChronoDuration::seconds(60))
                .await?;
            return Ok(());
        };

        match handler.execute(job).await {
            Ok(()) => {
                self.repo.complete(&job.id).await?;
                tracing::info!(
                    event_name = "worker.job_completed",
                    worker_id = %self.worker_id,
                    job_id = %job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    "job completed"
                );
            }
            Err(HandlerError::Retryable(message)) => {
                let retry_at = Utc::now() + self.backoff(job.attempts);
                self.repo.fail(&job.id, &message, retry_at).await?;
                tracing::warn!(
                    event_name = "worker.job_failed",
                    worker_id = %self.worker_id,
                    job_id = %job.id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    error = %message,
                    "job attempt failed"
                );
            }
            Err(HandlerError::Permanent(message)) => {
                self.repo.fail_permanent(&job.id, &message).await?;
                tracing::error!(
                    event_name = "worker.job_failed_permanent",
                    worker_id = %self.worker_id,
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %message,
                    "job failed permanently"
                );
            }
        }
        Ok(())
    }

    /// Exponential backoff with jitter:
    /// `min(base · 2^attempts, max) · U(0.5, 1.5)`.
    fn backoff(&self, attempts: i32) -> ChronoDuration {
        let exponent = attempts.clamp(0, 20) as u32;
        let raw = self
            .settings
            .base_backoff_secs
            .saturating_mul(2i64.saturating_pow(exponent))
            .min(self.settings.max_backoff_secs);
        let jitter: f64 = rand::thread_rng().gen_range(0.5..1.5);
        ChronoDuration::seconds(((raw as f64) * jitter).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use movely_core::{job_types, JobStatus};
    use movely_db::{
        connect_with_settings, migrations, JobRepository as _, NewJob, SqlJobRepository,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
        outcome: fn() -> Result<(), HandlerError>,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn execute(&self, _job: &Job) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn settings(role: WorkerRole) -> WorkerSettings {
        WorkerSettings {
            role,
            poll_interval: Duration::from_millis(50),
            lease_timeout_secs: 300,
            base_backoff_secs: 60,
            max_backoff_secs: 3600,
        }
    }

    async fn setup_repo() -> Arc<SqlJobRepository> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        Arc::new(SqlJobRepository::new(pool))
    }

    fn worker_with(
        repo: Arc<SqlJobRepository>,
        job_type: &'static str,
        outcome: fn() -> Result<(), HandlerError>,
    ) -> (JobWorker, Arc<CountingHandler>) {
        let handler = Arc::new(CountingHandler { calls: AtomicUsize::new(0), outcome });
        let mut handlers: HashMap<&'static str, Arc<dyn JobHandler>> = HashMap::new();
        handlers.insert(job_type, handler.clone());
        (JobWorker::new(repo, handlers, settings(WorkerRole::All)), handler)
    }

    #[tokio::test]
    async fn successful_execution_completes_the_job() {
        let repo = setup_repo().await;
        let id = repo
            .enqueue(NewJob::new("t-1", job_types::OUTBOUND_REPLY, serde_json::json!({})))
            .await
            .unwrap();

        let (worker, handler) = worker_with(repo.clone(), job_types::OUTBOUND_REPLY, || Ok(()));
        assert!(worker.run_once().await.unwrap());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        let job = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // Queue drained.
        assert!(!worker.run_once().await.unwrap());
    }

    #[tokio::test]
    async fn retryable_failure_reschedules_with_backoff() {
        let repo = setup_repo().await;
        let id = repo
            .enqueue(NewJob::new("t-1", job_types::OUTBOUND_REPLY, serde_json::json!({})))
            .await
            .unwrap();

        let (worker, _) = worker_with(repo.clone(), job_types::OUTBOUND_REPLY, || {
            Err(HandlerError::Retryable("boom".to_string()))
        });
        assert!(worker.run_once().await.unwrap());

        let job = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);
        // Backoff pushed the retry into the future.
        assert!(job.scheduled_at > Utc::now());

        // Not due yet, so nothing to claim.
        assert!(!worker.run_once().await.unwrap());
    }

    #[tokio::test]
    async fn permanent_failure_skips_remaining_attempts() {
        let repo = setup_repo().await;
        let id = repo
            .enqueue(NewJob::new("t-1", job_types::OUTBOUND_REPLY, serde_json::json!({})))
            .await
            .unwrap();

        let (worker, handler) = worker_with(repo.clone(), job_types::OUTBOUND_REPLY, || {
            Err(HandlerError::Permanent("auth rejected".to_string()))
        });
        assert!(worker.run_once().await.unwrap());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        let job = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("auth rejected"));

        assert!(!worker.run_once().await.unwrap());
    }

    #[tokio::test]
    async fn out_of_role_jobs_are_left_alone() {
        let repo = setup_repo().await;
        repo.enqueue(NewJob::new("t-1", job_types::NOTIFY_CREW_FALLBACK, serde_json::json!({})))
            .await
            .unwrap();

        // Worker only registered the outbound handler.
        let (worker, handler) = worker_with(repo.clone(), job_types::OUTBOUND_REPLY, || Ok(()));
        assert!(!worker.run_once().await.unwrap());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts.get("pending"), Some(&1));
    }

    #[test]
    fn backoff_grows_and_respects_the_cap() {
        let repo_settings = settings(WorkerRole::All);
        let worker = JobWorker {
            repo: std::sync::Arc::new(NullRepo),
            handlers: HashMap::new(),
            settings: repo_settings,
            worker_id: "worker-test".to_string(),
            claim_types: Vec::new(),
        };

        for attempts in 0..10 {
            let delay = worker.backoff(attempts).num_seconds();
            let raw = (60i64 * 2i64.pow(attempts as u32)).min(3600);
            // U(0.5, 1.5) band around the raw value.
            assert!(delay >= raw / 2, "attempt {attempts}: {delay} < {}", raw / 2);
            assert!(delay <= raw * 3 / 2 + 1, "attempt {attempts}: {delay} too large");
        }
    }

    // Minimal repo stub for the pure backoff test.
    struct NullRepo;

    #[async_trait]
    impl movely_db::JobRepository for NullRepo {
        async fn enqueue(&self, _job: NewJob) -> Result<String, movely_db::RepositoryError> {
            unimplemented!()
        }
        async fn claim_one(
            &self,
            _job_types: &[&str],
        ) -> Result<Option<Job>, movely_db::RepositoryError> {
            Ok(None)
        }
        async fn complete(&self, _job_id: &str) -> Result<(), movely_db::RepositoryError> {
            Ok(())
        }
        async fn fail(
            &self,
            _job_id: &str,
            _error_message: &str,
            _retry_at: chrono::DateTime<Utc>,
        ) -> Result<(), movely_db::RepositoryError> {
            Ok(())
        }
        async fn fail_permanent(
            &self,
            _job_id: &str,
            _error_message: &str,
        ) -> Result<(), movely_db::RepositoryError> {
            Ok(())
        }
        async fn reset_stale_running(
            &self,
            _lease_timeout_secs: i64,
        ) -> Result<u64, movely_db::RepositoryError> {
            Ok(0)
        }
        async fn get(&self, _job_id: &str) -> Result<Option<Job>, movely_db::RepositoryError> {
            Ok(None)
        }
        async fn count_by_status(
            &self,
        ) -> Result<std::collections::BTreeMap<String, i64>, movely_db::RepositoryError> {
            Ok(Default::default())
        }
        async fn cleanup_completed(
            &self,
            _ttl_days: i64,
        ) -> Result<u64, movely_db::RepositoryError> {
            Ok(0)
        }
        async fn cleanup_failed(&self, _ttl_days: i64) -> Result<u64, movely_db::RepositoryError> {
            Ok(0)
        }
    }
}
