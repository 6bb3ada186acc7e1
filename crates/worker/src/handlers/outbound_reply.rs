use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use movely_core::{Job, OutboundMessage, Provider};
use movely_db::{IdempotencyLedger, TenantRegistry};

use super::{HandlerError, JobHandler};
use crate::ports::ChannelSender;

#[derive(Debug, Deserialize)]
struct OutboundReplyPayload {
    provider: String,
    chat_id: String,
    text: String,
    #[serde(default)]
    buttons: Vec<movely_core::Button>,
    #[serde(default)]
    idempotency_key: Option<String>,
}

/// Send a reply to the customer via the tenant's channel binding.
pub struct OutboundReplyHandler {
    registry: Arc<TenantRegistry>,
    sender: Arc<dyn ChannelSender>,
    ledger: Arc<dyn IdempotencyLedger>,
}

impl OutboundReplyHandler {
    pub fn new(
        registry: Arc<TenantRegistry>,
        sender: Arc<dyn ChannelSender>,
        ledger: Arc<dyn IdempotencyLedger>,
    ) -> Self {
        Self { registry, sender, ledger }
    }
}

#[async_trait]
impl JobHandler for OutboundReplyHandler {
    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let payload: OutboundReplyPayload = serde_json::from_value(job.payload.clone())
            .map_err(|error| HandlerError::Permanent(format!("bad payload: {error}")))?;
        let provider = Provider::parse(&payload.provider).ok_or_else(|| {
            HandlerError::Permanent(format!("unknown provider `{}`", payload.provider))
        })?;

        if let Some(ref key) = payload.idempotency_key {
            if self.ledger.reserve(key).await? {
                tracing::debug!(
                    event_name = "job.outbound_reply.duplicate",
                    job_id = %job.id,
                    "reply already delivered, skipping"
                );
                return Ok(());
            }
        }

        let binding = self.registry.binding_for(&job.tenant_id, provider).await?;
        let credentials = self.registry.open_credentials(&binding)?;

        let message = OutboundMessage {
            tenant_id: job.tenant_id.clone(),
            chat_id: payload.chat_id.clone(),
            text: payload.text.clone(),
            buttons: payload.buttons.clone(),
            media_refs: Vec::new(),
        };
        self.sender.send(&credentials, &message).await?;

        if let Some(ref key) = payload.idempotency_key {
            self.ledger.mark_completed(key).await?;
        }

        tracing::info!(
            event_name = "job.outbound_reply.sent",
            job_id = %job.id,
            provider = %payload.provider,
            "reply delivered"
        );
        Ok(())
    }
}
