//! Seams to the external collaborators the worker drives: channel senders,
//! provider media fetchers, object storage. Production adapters live
//! outside this crate; the test doubles here record what they were asked
//! to do.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use movely_core::{CredentialMap, OutboundMessage, Provider};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Worth retrying: timeouts, 5xx, rate limits.
    #[error("transient delivery failure: {0}")]
    Transient(String),
    /// Not worth retrying: auth failures, closed template windows.
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        credentials: &CredentialMap,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(
        &self,
        provider: Provider,
        credentials: &CredentialMap,
        source_ref: &str,
    ) -> Result<FetchedMedia, DeliveryError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DeliveryError>;

    async fn delete(&self, key: &str) -> Result<(), DeliveryError>;
}

// ---------------------------------------------------------------------------
// HTTP channel sender
// ---------------------------------------------------------------------------

/// Posts the normalized message to the webhook URL carried in the binding
/// credentials. The concrete provider adapters render provider-specific
/// bodies; this generic sender is the deployment default for bridged
/// channels.
pub struct HttpChannelSender {
    client: reqwest::Client,
}

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

// Meta error code for a closed WhatsApp customer-care window.
const TEMPLATE_WINDOW_CLOSED: &str = "63016";

impl HttpChannelSender {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|error| DeliveryError::Permanent(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChannelSender for HttpChannelSender {
    async fn send(
        &self,
        credentials: &CredentialMap,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let url = credentials
            .get("webhook_url")
            .ok_or_else(|| DeliveryError::Permanent("binding has no webhook_url".to_string()))?;

        let mut request = self.client.post(url).json(message);
        if let Some(token) = credentials.get("auth_token") {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| DeliveryError::Transient(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(DeliveryError::Transient(format!("status {status}")));
        }
        if body.contains(TEMPLATE_WINDOW_CLOSED) {
            return Err(DeliveryError::Permanent("template window closed".to_string()));
        }
        Err(DeliveryError::Permanent(format!("status {status}")))
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub fail_with: Mutex<Option<DeliveryError>>,
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send(
        &self,
        _credentials: &CredentialMap,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Err(error);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticFetcher {
    pub media: HashMap<String, FetchedMedia>,
}

#[async_trait]
impl MediaFetcher for StaticFetcher {
    async fn fetch(
        &self,
        _provider: Provider,
        _credentials: &CredentialMap,
        source_ref: &str,
    ) -> Result<FetchedMedia, DeliveryError> {
        self.media
            .get(source_ref)
            .cloned()
            .ok_or_else(|| DeliveryError::Permanent(format!("unknown media ref {source_ref}")))
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DeliveryError> {
        self.objects.lock().unwrap().insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DeliveryError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
