use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use movely_core::{CrewLeadView, Job, LeadPayload, OutboundMessage};
use movely_db::{IdempotencyLedger, LeadRepository, TenantRegistry};

use super::notify_operator::operator_provider;
use super::{HandlerError, JobHandler};
use crate::notification::NotificationSettings;
use crate::ports::ChannelSender;

#[derive(Debug, Deserialize)]
struct CrewFallbackPayload {
    lead_id: String,
    #[serde(default)]
    idempotency_key: Option<String>,
}

/// Send the PII-free crew message to the operator, ready to forward into a
/// crew group. Scheduled a couple of seconds after finalization so the full
/// lead always lands first.
pub struct CrewFallbackHandler {
    registry: Arc<TenantRegistry>,
    leads: Arc<dyn LeadRepository>,
    ledger: Arc<dyn IdempotencyLedger>,
    sender: Arc<dyn ChannelSender>,
    settings: NotificationSettings,
    enabled: bool,
}

impl CrewFallbackHandler {
    pub fn new(
        registry: Arc<TenantRegistry>,
        leads: Arc<dyn LeadRepository>,
        ledger: Arc<dyn IdempotencyLedger>,
        sender: Arc<dyn ChannelSender>,
        settings: NotificationSettings,
        enabled: bool,
    ) -> Self {
        Self { registry, leads, ledger, sender, settings, enabled }
    }
}

#[async_trait]
impl JobHandler for CrewFallbackHandler {
    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let payload: CrewFallbackPayload = serde_json::from_value(job.payload.clone())
            .map_err(|error| HandlerError::Permanent(format!("bad payload: {error}")))?;

        let tenant_config = self.registry.tenant_config(&job.tenant_id).await?;
        // Per-tenant override wins over the global toggle.
        let enabled = tenant_config.crew_fallback_enabled().unwrap_or(self.enabled);
        if !enabled {
            return Ok(());
        }

        if let Some(ref key) = payload.idempotency_key {
            if self.ledger.reserve(key).await? {
                tracing::debug!(
                    event_name = "job.crew_fallback.duplicate",
                    job_id = %job.id,
                    "crew message already sent, skipping"
                );
                return Ok(());
            }
        }

        let lead = self
            .leads
            .find(&job.tenant_id, &payload.lead_id)
            .await?
            .ok_or_else(|| HandlerError::Retryable("lead not yet visible".to_string()))?;
        let lead_payload: LeadPayload = serde_json::from_value(lead.payload.clone())
            .map_err(|error| HandlerError::Permanent(format!("bad lead payload: {error}")))?;

        let Some(operator_chat_id) = tenant_config.operator_chat_id().map(str::to_string) else {
            if let Some(ref key) = payload.idempotency_key {
                self.ledger.mark_completed(key).await?;
            }
            return Ok(());
        };

        let lang = self.settings.target_lang;
        let view = CrewLeadView::project(lead_payload.lead_number, &lead_payload.data, lang);
        let message =
            OutboundMessage::text_only(&job.tenant_id, operator_chat_id, view.render(lang));

        let provider = operator_provider(&tenant_config);
        let binding = self.registry.binding_for(&job.tenant_id, provider).await?;
        let credentials = self.registry.open_credentials(&binding)?;
        self.sender.send(&credentials, &message).await?;

        if let Some(ref key) = payload.idempotency_key {
            self.ledger.mark_completed(key).await?;
        }

        tracing::info!(
            event_name = "job.crew_fallback.sent",
            job_id = %job.id,
            lead_seq = lead.lead_seq,
            "crew fallback delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use movely_core::{
        CredentialCipher, CredentialMap, CryptoError, ExtraService, Job, JobStatus, Language,
        LeadData, Provider, Stop, TenantConfig, TimeWindow, VolumeCategory,
    };
    use movely_db::{
        connect_with_settings, migrations, LeadRepository as _, SqlIdempotencyLedger,
        SqlLeadRepository, SqlTenantRepository, TenantRegistry, TenantRepository as _, TenantRow,
    };
    use crate::ports::RecordingSender;

    struct PlainCipher;

    impl CredentialCipher for PlainCipher {
        fn open(
            &self,
            blob: &[u8],
            _tenant_id: &str,
            _provider: Provider,
        ) -> Result<CredentialMap, CryptoError> {
            serde_json::from_slice(blob).map_err(|_| CryptoError::Malformed)
        }

        fn seal(
            &self,
            credentials: &CredentialMap,
            _tenant_id: &str,
            _provider: Provider,
        ) -> Result<Vec<u8>, CryptoError> {
            serde_json::to_vec(credentials).map_err(|_| CryptoError::Malformed)
        }
    }

    fn sample_payload() -> LeadPayload {
        let mut data = LeadData { pickup_count: 2, ..LeadData::default() };
        data.volume_category = Some(VolumeCategory::Xl);
        data.pickups = vec![
            Stop { floor_num: 6, has_elevator: false, ..Stop::new("Хайфа, ул. Первая 1") },
            Stop { floor_num: 1, has_elevator: true, ..Stop::new("Хайфа, ул. Вторая 2") },
        ];
        data.destination =
            Some(Stop { floor_num: 2, has_elevator: true, ..Stop::new("Тель-Авив") });
        data.date = Some("2026-03-25".to_string());
        data.time_window = Some(TimeWindow::Morning);
        data.extras = vec![ExtraService::Assembly];
        LeadPayload { lead_number: 4, language: Language::Ru, data }
    }

    async fn setup() -> (CrewFallbackHandler, Arc<RecordingSender>, movely_db::DbPool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let tenants = Arc::new(SqlTenantRepository::new(pool.clone()));
        tenants
            .upsert_tenant(&TenantRow {
                id: "t-1".to_string(),
                display_name: "T".to_string(),
                is_active: true,
                config: TenantConfig(serde_json::json!({"operator_chat_id": "op-chat"})),
            })
            .await
            .unwrap();
        tenants
            .upsert_binding(&movely_core::ChannelBinding {
                tenant_id: "t-1".to_string(),
                provider: Provider::Telegram,
                provider_account_id: "bot-1".to_string(),
                credentials_enc: b"{}".to_vec(),
                config: TenantConfig::default(),
                is_active: true,
            })
            .await
            .unwrap();
        // TTL 0 keeps the cache transparent to config edits mid-test.
        let registry = Arc::new(TenantRegistry::new(tenants, Arc::new(PlainCipher), 0));

        let leads = Arc::new(SqlLeadRepository::new(pool.clone()));
        let payload = serde_json::to_value(sample_payload()).unwrap();
        leads.insert_finalized("t-1", "lead-1", "chat-1", &payload).await.unwrap();

        let sender = Arc::new(RecordingSender::default());
        let handler = CrewFallbackHandler::new(
            registry,
            leads,
            Arc::new(SqlIdempotencyLedger::new(pool.clone())),
            sender.clone(),
            NotificationSettings {
                target_lang: Language::Ru,
                translation_enabled: false,
                max_inline_media_count: 3,
                link_ttl_secs: 3600,
            },
            true,
        );
        (handler, sender, pool)
    }

    fn crew_job() -> Job {
        Job {
            id: "job-1".to_string(),
            tenant_id: "t-1".to_string(),
            job_type: movely_core::job_types::NOTIFY_CREW_FALLBACK.to_string(),
            payload: serde_json::json!({
                "lead_id": "lead-1",
                "idempotency_key": "lead-1:crew_fallback_v1",
            }),
            status: JobStatus::Running,
            priority: 0,
            attempts: 1,
            max_attempts: 5,
            scheduled_at: Utc::now(),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn second_invocation_with_the_same_key_sends_nothing() {
        let (handler, sender, pool) = setup().await;

        handler.execute(&crew_job()).await.expect("first run");
        handler.execute(&crew_job()).await.expect("second run");

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1, "exactly one crew message despite replay");
        let message = &sent[0];
        assert_eq!(message.chat_id, "op-chat");
        // Crew view shape: numbered pickup lines, no street addresses.
        assert!(message.text.contains("Забор 1: 6 (без лифта)"));
        assert!(message.text.contains("Забор 2: 1 (есть лифт)"));
        assert!(message.text.contains("Доставка: 2 (есть лифт)"));
        assert!(!message.text.contains("ул. Первая"));

        pool.close().await;
    }

    #[tokio::test]
    async fn disabled_tenant_override_skips_the_send() {
        let (handler, sender, pool) = setup().await;

        // Flip the per-tenant override off.
        let tenants = SqlTenantRepository::new(pool.clone());
        tenants
            .upsert_tenant(&TenantRow {
                id: "t-1".to_string(),
                display_name: "T".to_string(),
                is_active: true,
                config: TenantConfig(serde_json::json!({
                    "operator_chat_id": "op-chat",
                    "dispatch_crew_fallback_enabled": false,
                })),
            })
            .await
            .unwrap();

        handler.execute(&crew_job()).await.expect("run");
        assert!(sender.sent.lock().unwrap().is_empty());

        pool.close().await;
    }
}
