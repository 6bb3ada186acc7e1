//! Ingress use-case: one inbound provider event in, one reply out.
//!
//! Order of operations: tenant resolution → inbound dedup → session fetch
//! (with TTL) → engine step → guarded session write → finalization on a
//! terminal step → job enqueueing. The engine itself never touches the
//! store; everything side-effecting happens here or in the worker.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use movely_core::{
    job_types, ApplicationError, EngineContext, InputEvent, LeadPayload, MovingBotEngine,
    ProviderEvent, SessionState, Step,
};
use movely_db::{
    InboundRepository, JobRepository, LeadRepository, NewJob, RepositoryError, SessionStore,
    TenantRegistry,
};

pub const DUPLICATE_REPLY: &str = "(duplicate ignored)";

// Reply jobs jump the queue so the user never waits behind notifications.
const REPLY_PRIORITY: i32 = 10;
const NOTIFY_PRIORITY: i32 = 5;

#[derive(Clone, Debug)]
pub struct IngressConfig {
    pub session_ttl_seconds: i64,
    pub session_stale_hint_seconds: i64,
    pub crew_fallback_enabled: bool,
    pub crew_fallback_delay_secs: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IngressReply {
    pub reply: Option<String>,
    pub step: Step,
    pub lead_id: String,
    pub terminal: bool,
    pub duplicate: bool,
}

pub struct IngressService {
    engine: Arc<MovingBotEngine>,
    registry: Arc<TenantRegistry>,
    sessions: Arc<dyn SessionStore>,
    leads: Arc<dyn LeadRepository>,
    inbound: Arc<dyn InboundRepository>,
    jobs: Arc<dyn JobRepository>,
    config: IngressConfig,
}

impl IngressService {
    pub fn new(
        engine: Arc<MovingBotEngine>,
        registry: Arc<TenantRegistry>,
        sessions: Arc<dyn SessionStore>,
        leads: Arc<dyn LeadRepository>,
        inbound: Arc<dyn InboundRepository>,
        jobs: Arc<dyn JobRepository>,
        config: IngressConfig,
    ) -> Self {
        Self { engine, registry, sessions, leads, inbound, jobs, config }
    }

    pub async fn process(&self, event: ProviderEvent) -> Result<IngressReply, ApplicationError> {
        let tenant = self.registry.resolve(event.provider, &event.provider_account_id).await?;
        let tenant_id = tenant.tenant_id.clone();
        let now = Utc::now();

        // At-most-once per (tenant, provider, message_id).
        let duplicate = self
            .inbound
            .seen_or_mark(&tenant_id, event.provider, &event.message_id, &event.chat_id)
            .await
            .map_err(persistence)?;
        if duplicate {
            let state = self.sessions.get(&tenant_id, &event.chat_id).await.map_err(persistence)?;
            let (step, lead_id) = state
                .map(|s| (s.step, s.lead_id))
                .unwrap_or_else(|| (Step::Welcome, String::new()));
            tracing::debug!(
                event_name = "ingress.duplicate",
                correlation_id = %event.message_id,
                "duplicate inbound short-circuited"
            );
            return Ok(IngressReply {
                reply: Some(DUPLICATE_REPLY.to_string()),
                step,
                lead_id,
                terminal: false,
                duplicate: true,
            });
        }

        // Session fetch with TTL enforcement.
        let mut existing =
            self.sessions.get(&tenant_id, &event.chat_id).await.map_err(persistence)?;
        if let Some(ref state) = existing {
            if (now - state.updated_at).num_seconds() > self.config.session_ttl_seconds {
                self.sessions.delete(&tenant_id, &event.chat_id).await.map_err(persistence)?;
                existing = None;
            }
        }
        let observed = existing.as_ref().map(|state| state.updated_at);
        let is_stale = existing.as_ref().is_some_and(|state| {
            (now - state.updated_at).num_seconds() > self.config.session_stale_hint_seconds
        });

        let mut state = match existing {
            Some(state) => state,
            None => {
                // The first message decides the initial language.
                let language = event
                    .text
                    .as_deref()
                    .and_then(movely_core::bots::moving::validators::detect_language)
                    .unwrap_or(movely_core::Language::Ru);
                SessionState::new(&tenant_id, &event.chat_id, language, now)
            }
        };
        let original_step = state.step;

        if let Some(ref sender_name) = event.sender_name {
            if state.data.extensions.sender_name().is_none() {
                state.data.extensions.set_sender_name(sender_name);
            }
        }

        let input = build_input(&event);
        let operator_contact = tenant.config.operator_whatsapp().map(str::to_string);
        let ctx = EngineContext {
            now,
            today: now.date_naive(),
            operator_contact: operator_contact.as_deref(),
        };
        let outcome = self.engine.handle(state, &input, &ctx);
        let terminal = outcome.terminal;
        let new_state = outcome.state;
        let mut reply = outcome.reply;

        // Serialization point: a concurrent message for the same chat makes
        // this a conflict, the provider retries, and the dedup row from the
        // committed attempt short-circuits the replay.
        self.sessions.upsert(&new_state, observed).await.map_err(persistence)?;

        // Media ingestion runs out of band. The lead association travels in
        // the job payload so finalization cannot race it.
        if let InputEvent::Media(ref items) = input {
            self.jobs
                .enqueue(NewJob::new(
                    &tenant_id,
                    job_types::PROCESS_MEDIA,
                    json!({
                        "provider": event.provider.as_str(),
                        "chat_id": event.chat_id,
                        "lead_id": new_state.lead_id,
                        "message_id": event.message_id,
                        "items": items,
                    }),
                ))
                .await
                .map_err(persistence)?;
        }

        if let Some(ref text) = reply {
            self.jobs
                .enqueue(
                    NewJob::new(
                        &tenant_id,
                        job_types::OUTBOUND_REPLY,
                        json!({
                            "provider": event.provider.as_str(),
                            "chat_id": event.chat_id,
                            "text": text,
                        }),
                    )
                    .with_priority(REPLY_PRIORITY),
                )
                .await
                .map_err(persistence)?;
        }

        if terminal {
            self.finalize(&tenant_id, &new_state, tenant.config.crew_fallback_enabled()).await?;
        } else if is_stale && original_step != Step::Welcome {
            if let Some(text) = reply.take() {
                let hint = movely_core::bots::moving::texts::text(
                    "hint_stale_resume",
                    new_state.language,
                );
                reply = Some(format!("{hint}\n\n{text}"));
            }
        }

        Ok(IngressReply {
            reply,
            step: new_state.step,
            lead_id: new_state.lead_id,
            terminal,
            duplicate: false,
        })
    }

    /// Finalization: assign the sequence number, freeze the payload, enqueue
    /// the notification jobs, then drop the session row.
    async fn finalize(
        &self,
        tenant_id: &str,
        state: &SessionState,
        tenant_crew_override: Option<bool>,
    ) -> Result<(), ApplicationError> {
        let provisional = LeadPayload {
            lead_number: 0,
            language: state.language,
            data: state.data.clone(),
        };
        let provisional_value = serde_json::to_value(&provisional)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        let seq = self
            .leads
            .insert_finalized(tenant_id, &state.lead_id, &state.chat_id, &provisional_value)
            .await
            .map_err(persistence)?;

        let mut payload =
            LeadPayload { lead_number: seq, language: state.language, data: state.data.clone() };
        payload.data.extensions.set_lead_number(seq);
        let payload_value = serde_json::to_value(&payload)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        self.leads
            .update_payload(tenant_id, &state.lead_id, &payload_value)
            .await
            .map_err(persistence)?;

        self.jobs
            .enqueue(
                NewJob::new(
                    tenant_id,
                    job_types::NOTIFY_OPERATOR,
                    json!({
                        "lead_id": state.lead_id,
                        "idempotency_key": format!("{}:notify_operator_v1", state.lead_id),
                    }),
                )
                .with_priority(NOTIFY_PRIORITY),
            )
            .await
            .map_err(persistence)?;

        let crew_enabled = tenant_crew_override.unwrap_or(self.config.crew_fallback_enabled);
        if crew_enabled {
            // Delayed so the full operator lead always arrives first.
            self.jobs
                .enqueue(
                    NewJob::new(
                        tenant_id,
                        job_types::NOTIFY_CREW_FALLBACK,
                        json!({
                            "lead_id": state.lead_id,
                            "idempotency_key": format!("{}:crew_fallback_v1", state.lead_id),
                        }),
                    )
                    .with_delay_seconds(self.config.crew_fallback_delay_secs),
                )
                .await
                .map_err(persistence)?;
        }

        self.sessions.delete(tenant_id, &state.chat_id).await.map_err(persistence)?;

        tracing::info!(
            event_name = "ingress.lead_finalized",
            correlation_id = %state.lead_id,
            lead_seq = seq,
            "lead finalized and notification jobs enqueued"
        );
        Ok(())
    }
}

fn build_input(event: &ProviderEvent) -> InputEvent {
    if event.has_text() {
        return InputEvent::Text(event.text.clone().unwrap_or_default());
    }
    if let Some(ref payload) = event.button_payload {
        return InputEvent::Button(payload.clone());
    }
    if let Some(location) = event.location {
        return InputEvent::Location { lat: location.lat, lng: location.lng, label: None };
    }
    if !event.media.is_empty() {
        return InputEvent::Media(event.media.clone());
    }
    // Empty event: the step validator re-prompts.
    InputEvent::Text(String::new())
}

fn persistence(error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::Conflict => ApplicationError::SessionConflict,
        other => ApplicationError::Persistence(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HmacTagCipher;
    use movely_core::{
        build_engine, CredentialCipher, CredentialMap, Language, PricingSettings, Provider,
        RouteBand, TenantConfig, MOVING_BOT_TYPE,
    };
    use movely_db::{
        connect_with_settings, migrations, DbPool, SqlInboundRepository, SqlJobRepository,
        SqlLeadRepository, SqlSessionStore, SqlTenantRepository, TenantRepository, TenantRow,
    };

    struct Harness {
        pool: DbPool,
        service: IngressService,
        leads: Arc<SqlLeadRepository>,
        jobs: Arc<SqlJobRepository>,
        sessions: Arc<SqlSessionStore>,
        inbound: Arc<SqlInboundRepository>,
    }

    async fn harness() -> Harness {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");

        let tenants = Arc::new(SqlTenantRepository::new(pool.clone()));
        let cipher = Arc::new(HmacTagCipher::new("test-key".to_string().into()).unwrap());

        tenants
            .upsert_tenant(&TenantRow {
                id: "t-1".to_string(),
                display_name: "Test Movers".to_string(),
                is_active: true,
                config: TenantConfig(json!({"operator_chat_id": "op-chat"})),
            })
            .await
            .unwrap();
        let mut creds = CredentialMap::new();
        creds.insert("bot_token".to_string(), "tok".to_string());
        let sealed = cipher.seal(&creds, "t-1", Provider::Telegram).unwrap();
        tenants
            .upsert_binding(&movely_core::ChannelBinding {
                tenant_id: "t-1".to_string(),
                provider: Provider::Telegram,
                provider_account_id: "bot-100".to_string(),
                credentials_enc: sealed,
                config: TenantConfig::default(),
                is_active: true,
            })
            .await
            .unwrap();

        let registry = Arc::new(TenantRegistry::new(tenants, cipher, 300));
        let sessions = Arc::new(SqlSessionStore::new(pool.clone()));
        let leads = Arc::new(SqlLeadRepository::new(pool.clone()));
        let inbound = Arc::new(SqlInboundRepository::new(pool.clone()));
        let jobs = Arc::new(SqlJobRepository::new(pool.clone()));

        let engine = Arc::new(
            build_engine(&[MOVING_BOT_TYPE.to_string()], PricingSettings::default(), true)
                .unwrap(),
        );

        let service = IngressService::new(
            engine,
            registry,
            sessions.clone(),
            leads.clone(),
            inbound.clone(),
            jobs.clone(),
            IngressConfig {
                session_ttl_seconds: 72 * 3600,
                session_stale_hint_seconds: 6 * 3600,
                crew_fallback_enabled: true,
                crew_fallback_delay_secs: 2,
            },
        );

        Harness { pool, service, leads, jobs, sessions, inbound }
    }

    fn text_event(message_id: &str, text: &str) -> ProviderEvent {
        ProviderEvent {
            provider: Provider::Telegram,
            provider_account_id: "bot-100".to_string(),
            chat_id: "chat-1".to_string(),
            message_id: message_id.to_string(),
            text: Some(text.to_string()),
            button_payload: None,
            location: None,
            media: Vec::new(),
            sender_name: None,
        }
    }

    async fn send(h: &Harness, message_id: &str, text: &str) -> IngressReply {
        h.service.process(text_event(message_id, text)).await.expect("process")
    }

    async fn drive_happy_path(h: &Harness, run: &str) -> IngressReply {
        let inputs = [
            "Здравствуйте",
            "Холодильник, диван",
            "1",
            "Хайфа, ул. Херцль 10, этаж 3, без лифта",
            "3 этаж, без лифта",
            "Тель-Авив, Дизенгоф 50",
            "2 этаж, лифт есть",
            "завтра",
            "1",
            "2",
            "4",
        ];
        let mut last = None;
        for (index, input) in inputs.iter().enumerate() {
            last = Some(send(h, &format!("{run}-m-{index}"), input).await);
        }
        let estimate_reply = last.expect("at least one reply");
        assert_eq!(estimate_reply.step, Step::Estimate);
        send(h, &format!("{run}-m-confirm"), "1").await
    }

    #[tokio::test]
    async fn happy_path_finalizes_and_cleans_the_session() {
        let h = harness().await;
        let done = drive_happy_path(&h, "run1").await;
        assert!(done.terminal);
        assert_eq!(done.step, Step::Done);

        // Session row is gone; re-arrival starts fresh.
        assert!(h.sessions.get("t-1", "chat-1").await.unwrap().is_none());

        // Exactly one lead with seq 1.
        let lead = h.leads.find("t-1", &done.lead_id).await.unwrap().expect("lead persisted");
        assert_eq!(lead.lead_seq, 1);
        assert_eq!(h.leads.count("t-1").await.unwrap(), 1);

        let payload: LeadPayload = serde_json::from_value(lead.payload).unwrap();
        assert_eq!(payload.lead_number, 1);
        assert_eq!(payload.language, Language::Ru);
        let estimate = payload.data.estimate.expect("estimate frozen");
        // Haifa → Tel Aviv clears the same-metro minimum comfortably.
        assert!(estimate.min >= 350);
        let labels: Vec<&str> =
            estimate.breakdown.entries.iter().map(|e| e.label.as_str()).collect();
        assert!(labels.contains(&"item:fridge x1"));
        assert!(labels.contains(&"item:sofa x1"));
        assert_eq!(
            payload.data.route_classification.map(|r| r.band),
            Some(RouteBand::InterRegionShort)
        );

        // A second lead gets the next sequence number.
        let second = drive_happy_path(&h, "run2").await;
        let lead2 = h.leads.find("t-1", &second.lead_id).await.unwrap().unwrap();
        assert_eq!(lead2.lead_seq, 2);

        h.pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_webhook_is_ignored_with_one_row() {
        let h = harness().await;

        let first = send(&h, "dup-1", "Здравствуйте").await;
        assert!(!first.duplicate);
        let state_after_first = h.sessions.get("t-1", "chat-1").await.unwrap().unwrap();

        let second = h.service.process(text_event("dup-1", "Здравствуйте")).await.unwrap();
        assert!(second.duplicate);
        assert_eq!(second.reply.as_deref(), Some(DUPLICATE_REPLY));

        // Exactly one dedup row; session untouched by the replay.
        assert_eq!(h.inbound.count("t-1").await.unwrap(), 1);
        let state_after_second = h.sessions.get("t-1", "chat-1").await.unwrap().unwrap();
        assert_eq!(state_after_first, state_after_second);

        h.pool.close().await;
    }

    #[tokio::test]
    async fn attribute_suffixed_quantities_stay_at_one() {
        let h = harness().await;
        send(&h, "q-0", "Здравствуйте").await;
        let reply = send(&h, "q-1", "Холодильник 200кг, 5 дверный шкаф").await;
        assert_eq!(reply.step, Step::PickupCount);

        let state = h.sessions.get("t-1", "chat-1").await.unwrap().unwrap();
        let items: Vec<(&str, u32)> =
            state.data.items.iter().map(|i| (i.key.as_str(), i.qty)).collect();
        assert_eq!(items, vec![("fridge", 1), ("wardrobe", 1)]);

        h.pool.close().await;
    }

    #[tokio::test]
    async fn finalization_enqueues_ordered_notification_jobs() {
        let h = harness().await;
        let before = Utc::now();
        let done = drive_happy_path(&h, "run3").await;

        let (operator_id,): (String,) =
            sqlx::query_as("SELECT id FROM jobs WHERE job_type = 'notify_operator'")
                .fetch_one(&h.pool)
                .await
                .unwrap();
        let operator_job = h.jobs.get(&operator_id).await.unwrap().unwrap();
        assert!(operator_job.scheduled_at <= Utc::now());
        assert_eq!(
            operator_job.idempotency_key(),
            Some(format!("{}:notify_operator_v1", done.lead_id).as_str())
        );

        // The crew job carries the 2-second head start for the full lead.
        let (crew_id,): (String,) =
            sqlx::query_as("SELECT id FROM jobs WHERE job_type = 'notify_crew_fallback'")
                .fetch_one(&h.pool)
                .await
                .unwrap();
        let crew_job = h.jobs.get(&crew_id).await.unwrap().unwrap();
        assert!(crew_job.scheduled_at >= before + chrono::Duration::seconds(2));
        assert_eq!(
            crew_job.idempotency_key(),
            Some(format!("{}:crew_fallback_v1", done.lead_id).as_str())
        );
        // Not claimable until the delay passes.
        assert!(h.jobs.claim_one(&[job_types::NOTIFY_CREW_FALLBACK]).await.unwrap().is_none());

        h.pool.close().await;
    }

    #[tokio::test]
    async fn replies_are_enqueued_as_outbound_jobs() {
        let h = harness().await;
        send(&h, "r-1", "Здравствуйте").await;

        let job = h
            .jobs
            .claim_one(&[job_types::OUTBOUND_REPLY])
            .await
            .unwrap()
            .expect("reply job enqueued");
        assert_eq!(job.payload["provider"], "telegram");
        assert_eq!(job.payload["chat_id"], "chat-1");
        assert!(job.payload["text"].as_str().unwrap().contains("перевозку"));

        h.pool.close().await;
    }

    #[tokio::test]
    async fn unknown_channel_identity_is_rejected() {
        let h = harness().await;
        let mut event = text_event("x-1", "привет");
        event.provider_account_id = "bot-999".to_string();
        let error = h.service.process(event).await.unwrap_err();
        assert!(matches!(error, ApplicationError::TenantNotResolved));

        h.pool.close().await;
    }

    #[tokio::test]
    async fn media_events_enqueue_processing_jobs() {
        let h = harness().await;
        // Reach photo_wait.
        let inputs = [
            "Здравствуйте",
            "Холодильник",
            "1",
            "Хайфа, центр",
            "этаж 1",
            "Тель-Авив",
            "этаж 1",
            "завтра",
            "1",
        ];
        for (index, input) in inputs.iter().enumerate() {
            send(&h, &format!("p-{index}"), input).await;
        }
        let reply = send(&h, "p-photo-menu", "1").await;
        assert_eq!(reply.step, Step::PhotoWait);

        let mut event = text_event("p-media", "");
        event.text = None;
        event.media = vec![movely_core::InboundMedia {
            content_type: "image/jpeg".to_string(),
            size_bytes: 2048,
            source_ref: "file-77".to_string(),
        }];
        let reply = h.service.process(event).await.unwrap();
        assert_eq!(reply.step, Step::PhotoWait);

        let job = h
            .jobs
            .claim_one(&[job_types::PROCESS_MEDIA])
            .await
            .unwrap()
            .expect("media job enqueued");
        assert_eq!(job.payload["lead_id"], reply.lead_id);
        assert_eq!(job.payload["items"][0]["source_ref"], "file-77");

        h.pool.close().await;
    }
}
