use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use movely_core::{Job, LeadPayload, Provider};
use movely_db::{IdempotencyLedger, LeadRepository, MediaAssetRepository, TenantRegistry};

use super::{HandlerError, JobHandler};
use crate::notification::{build_operator_delivery, NotificationSettings};
use crate::ports::ChannelSender;
use crate::signing::MediaUrlSigner;

#[derive(Debug, Deserialize)]
struct NotifyOperatorPayload {
    lead_id: String,
    #[serde(default)]
    idempotency_key: Option<String>,
}

/// Deliver the full lead to the tenant's operator channel.
pub struct NotifyOperatorHandler {
    registry: Arc<TenantRegistry>,
    leads: Arc<dyn LeadRepository>,
    media: Arc<dyn MediaAssetRepository>,
    ledger: Arc<dyn IdempotencyLedger>,
    sender: Arc<dyn ChannelSender>,
    signer: Arc<MediaUrlSigner>,
    settings: NotificationSettings,
}

impl NotifyOperatorHandler {
    pub fn new(
        registry: Arc<TenantRegistry>,
        leads: Arc<dyn LeadRepository>,
        media: Arc<dyn MediaAssetRepository>,
        ledger: Arc<dyn IdempotencyLedger>,
        sender: Arc<dyn ChannelSender>,
        signer: Arc<MediaUrlSigner>,
        settings: NotificationSettings,
    ) -> Self {
        Self { registry, leads, media, ledger, sender, signer, settings }
    }
}

/// Resolve the operator channel for a tenant: the configured provider's
/// binding (default telegram) plus the operator chat id.
pub(crate) fn operator_provider(config: &movely_core::TenantConfig) -> Provider {
    config
        .0
        .get("operator_provider")
        .and_then(serde_json::Value::as_str)
        .and_then(Provider::parse)
        .unwrap_or(Provider::Telegram)
}

#[async_trait]
impl JobHandler for NotifyOperatorHandler {
    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let payload: NotifyOperatorPayload = serde_json::from_value(job.payload.clone())
            .map_err(|error| HandlerError::Permanent(format!("bad payload: {error}")))?;

        if let Some(ref key) = payload.idempotency_key {
            if self.ledger.reserve(key).await? {
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

        let tenant_config = self.registry.tenant_config(&job.tenant_id).await?;
        let Some(operator_chat_id) = tenant_config.operator_chat_id().map(str::to_string) else {
            // Tenants without an operator chat have notifications disabled.
            tracing::debug!(
                event_name = "job.notify_operator.disabled",
                job_id = %job.id,
                "no operator chat configured, skipping"
            );
            if let Some(ref key) = payload.idempotency_key {
                self.ledger.mark_completed(key).await?;
            }
            return Ok(());
        };
        let provider = operator_provider(&tenant_config);
        let binding = self.registry.binding_for(&job.tenant_id, provider).await?;

        let assets = self.media.list_for_lead(&job.tenant_id, &payload.lead_id).await?;
        let message = build_operator_delivery(
            &lead_payload,
            &job.tenant_id,
            &operator_chat_id,
            &lead.chat_id,
            &assets,
            &self.signer,
            &self.settings,
        );

        let credentials = self.registry.open_credentials(&binding)?;
        self.sender.send(&credentials, &message).await?;

        if let Some(ref key) = payload.idempotency_key {
            self.ledger.mark_completed(key).await?;
        }

        tracing::info!(
            event_name = "job.notify_operator.sent",
            job_id = %job.id,
            lead_seq = lead.lead_seq,
            "operator notified"
        );
        Ok(())
    }
}
