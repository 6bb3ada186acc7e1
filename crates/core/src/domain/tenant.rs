use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::message::Provider;

/// Non-secret per-tenant configuration (quotas, feature flags, operator
/// contact). Free-form JSON; readers use the typed accessors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantConfig(pub serde_json::Value);

impl TenantConfig {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(serde_json::Value::as_bool)
    }

    pub fn operator_chat_id(&self) -> Option<&str> {
        self.get_str("operator_chat_id")
    }

    pub fn operator_whatsapp(&self) -> Option<&str> {
        self.get_str("operator_whatsapp")
    }

    /// Per-tenant override for the crew-fallback toggle.
    pub fn crew_fallback_enabled(&self) -> Option<bool> {
        self.get_bool("dispatch_crew_fallback_enabled")
    }
}

/// Decrypted credentials for one channel binding. Values are held only for
/// the duration of a send.
pub type CredentialMap = BTreeMap<String, String>;

/// A tenant's binding to one provider identity. Credentials stay encrypted
/// in this struct; decrypt per use via [`CredentialCipher`].
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelBinding {
    pub tenant_id: String,
    pub provider: Provider,
    pub provider_account_id: String,
    pub credentials_enc: Vec<u8>,
    pub config: TenantConfig,
    pub is_active: bool,
}

/// Immutable snapshot handed to the ingress path after resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantContext {
    pub tenant_id: String,
    pub is_active: bool,
    pub config: TenantConfig,
    pub binding: ChannelBinding,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The blob's context tag does not match the expected
    /// `tenant_id:provider` binding. Deliberately carries no identifiers.
    #[error("credential context mismatch")]
    ContextMismatch,
    #[error("credential blob is malformed")]
    Malformed,
    #[error("encryption key not configured")]
    NotConfigured,
}

/// Seam for the external credential-encryption component. Implementations
/// must fail closed on a context-tag mismatch without revealing which side
/// mismatched.
pub trait CredentialCipher: Send + Sync {
    fn open(
        &self,
        blob: &[u8],
        tenant_id: &str,
        provider: Provider,
    ) -> Result<CredentialMap, CryptoError>;

    fn seal(
        &self,
        credentials: &CredentialMap,
        tenant_id: &str,
        provider: Provider,
    ) -> Result<Vec<u8>, CryptoError>;
}
