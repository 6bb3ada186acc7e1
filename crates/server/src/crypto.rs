//! Context-bound credential sealing for deployments without an external
//! KMS. The blob is JSON with an HMAC-SHA256 tag over the credentials and
//! the `tenant_id:provider` context, so a blob copied onto another binding
//! fails closed. Production deployments substitute the KMS-backed cipher
//! behind the same [`CredentialCipher`] trait.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use movely_core::{CredentialCipher, CredentialMap, CryptoError, Provider};

type HmacSha256 = Hmac<Sha256>;

pub struct HmacTagCipher {
    key: SecretString,
}

impl HmacTagCipher {
    pub fn new(key: SecretString) -> Result<Self, CryptoError> {
        if key.expose_secret().is_empty() {
            return Err(CryptoError::NotConfigured);
        }
        Ok(Self { key })
    }

    pub fn from_env() -> Result<Self, CryptoError> {
        let key = std::env::var("MOVELY_TENANT_KEY").map_err(|_| CryptoError::NotConfigured)?;
        Self::new(key.into())
    }

    fn tag(&self, body: &str, tenant_id: &str, provider: Provider) -> String {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .expect("hmac accepts any key length");
        mac.update(format!("{tenant_id}:{}:", provider.as_str()).as_bytes());
        mac.update(body.as_bytes());
        mac.finalize().into_bytes().iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl CredentialCipher for HmacTagCipher {
    fn open(
        &self,
        blob: &[u8],
        tenant_id: &str,
        provider: Provider,
    ) -> Result<CredentialMap, CryptoError> {
        let raw = std::str::from_utf8(blob).map_err(|_| CryptoError::Malformed)?;
        let (tag, body) = raw.split_once('.').ok_or(CryptoError::Malformed)?;
        if tag != self.tag(body, tenant_id, provider) {
            return Err(CryptoError::ContextMismatch);
        }
        serde_json::from_str(body).map_err(|_| CryptoError::Malformed)
    }

    fn seal(
        &self,
        credentials: &CredentialMap,
        tenant_id: &str,
        provider: Provider,
    ) -> Result<Vec<u8>, CryptoError> {
        let body = serde_json::to_string(credentials).map_err(|_| CryptoError::Malformed)?;
        let tag = self.tag(&body, tenant_id, provider);
        Ok(format!("{tag}.{body}").into_bytes())
    }
}
