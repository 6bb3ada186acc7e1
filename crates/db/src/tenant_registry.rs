//! Cached `(provider, provider_account_id) → TenantContext` resolution.
//!
//! The cache holds tenants and their bindings with credentials still
//! encrypted; decryption happens per use through the injected
//! [`CredentialCipher`]. A context-tag mismatch fails closed without
//! naming the tenant or provider in the error.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use movely_core::{
    ApplicationError, ChannelBinding, CredentialCipher, CredentialMap, Provider, TenantConfig,
    TenantContext,
};

use crate::repositories::{RepositoryError, TenantRepository};

struct CacheEntry {
    tenant_id: String,
    is_active: bool,
    config: TenantConfig,
    binding: ChannelBinding,
}

struct CacheState {
    by_channel: HashMap<(Provider, String), CacheEntry>,
    by_tenant: HashMap<(String, Provider), ChannelBinding>,
    tenant_configs: HashMap<String, TenantConfig>,
    loaded_at: Option<DateTime<Utc>>,
}

pub struct TenantRegistry {
    repo: Arc<dyn TenantRepository>,
    cipher: Arc<dyn CredentialCipher>,
    ttl: Duration,
    cache: RwLock<CacheState>,
}

impl TenantRegistry {
    pub fn new(
        repo: Arc<dyn TenantRepository>,
        cipher: Arc<dyn CredentialCipher>,
        ttl_secs: i64,
    ) -> Self {
        Self {
            repo,
            cipher,
            ttl: Duration::seconds(ttl_secs),
            cache: RwLock::new(CacheState {
                by_channel: HashMap::new(),
                by_tenant: HashMap::new(),
                tenant_configs: HashMap::new(),
                loaded_at: None,
            }),
        }
    }

    /// Resolve the inbound channel identity to a tenant. Refreshes the
    /// cache when the TTL has lapsed.
    pub async fn resolve(
        &self,
        provider: Provider,
        provider_account_id: &str,
    ) -> Result<TenantContext, ApplicationError> {
        self.refresh_if_stale().await?;

        let cache = self.cache.read().await;
        let entry = cache
            .by_channel
            .get(&(provider, provider_account_id.to_string()))
            .filter(|entry| entry.is_active)
            .ok_or(ApplicationError::TenantNotResolved)?;

        Ok(TenantContext {
            tenant_id: entry.tenant_id.clone(),
            is_active: entry.is_active,
            config: entry.config.clone(),
            binding: entry.binding.clone(),
        })
    }

    /// Look up a tenant's own binding for a provider (outbound direction).
    pub async fn binding_for(
        &self,
        tenant_id: &str,
        provider: Provider,
    ) -> Result<ChannelBinding, ApplicationError> {
        self.refresh_if_stale().await?;
        let cache = self.cache.read().await;
        cache
            .by_tenant
            .get(&(tenant_id.to_string(), provider))
            .cloned()
            .ok_or(ApplicationError::TenantNotResolved)
    }

    /// A tenant's non-secret config (operator contact, feature overrides).
    pub async fn tenant_config(&self, tenant_id: &str) -> Result<TenantConfig, ApplicationError> {
        self.refresh_if_stale().await?;
        let cache = self.cache.read().await;
        cache
            .tenant_configs
            .get(tenant_id)
            .cloned()
            .ok_or(ApplicationError::TenantNotResolved)
    }

    /// Decrypt a binding's credentials for one send. Only the ciphertext is
    /// cached, so a rotated key takes effect on the next call.
    pub fn open_credentials(
        &self,
        binding: &ChannelBinding,
    ) -> Result<CredentialMap, ApplicationError> {
        self.cipher
            .open(&binding.credentials_enc, &binding.tenant_id, binding.provider)
            .map_err(|error| {
                // Deliberately generic: no tenant or provider identifiers.
                tracing::error!(
                    event_name = "tenant.credential_open_failed",
                    "credential decryption failed"
                );
                ApplicationError::Crypto(error)
            })
    }

    /// Force a reload on the next resolution (admin-triggered refresh).
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.loaded_at = None;
    }

    async fn refresh_if_stale(&self) -> Result<(), ApplicationError> {
        {
            let cache = self.cache.read().await;
            if let Some(loaded_at) = cache.loaded_at {
                if Utc::now() - loaded_at < self.ttl {
                    return Ok(());
                }
            }
        }

        let loaded = self.repo.load_active().await.map_err(map_repo_error)?;

        let mut by_channel = HashMap::new();
        let mut by_tenant = HashMap::new();
        let mut tenant_configs = HashMap::new();
        let mut tenant_count = 0usize;
        for (tenant, bindings) in loaded {
            tenant_count += 1;
            tenant_configs.insert(tenant.id.clone(), tenant.config.clone());
            for binding in bindings {
                by_tenant.insert((tenant.id.clone(), binding.provider), binding.clone());
                by_channel.insert(
                    (binding.provider, binding.provider_account_id.clone()),
                    CacheEntry {
                        tenant_id: tenant.id.clone(),
                        is_active: tenant.is_active,
                        config: tenant.config.clone(),
                        binding,
                    },
                );
            }
        }

        let mut cache = self.cache.write().await;
        cache.by_channel = by_channel;
        cache.by_tenant = by_tenant;
        cache.tenant_configs = tenant_configs;
        cache.loaded_at = Some(Utc::now());
        tracing::info!(
            event_name = "tenant.registry_refreshed",
            tenants = tenant_count,
            channels = cache.by_channel.len(),
            "tenant registry cache refreshed"
        );
        Ok(())
    }
}

fn map_repo_error(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
