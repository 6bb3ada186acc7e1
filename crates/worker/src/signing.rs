//! Signed media delivery URLs.
//!
//! The worker only mints references; validation happens at the external
//! media endpoint, which recomputes the same HMAC over
//! `tenant:kind:asset_id:exp`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use movely_core::MediaKind;

type HmacSha256 = Hmac<Sha256>;

pub struct MediaUrlSigner {
    secret: SecretString,
    base_url: String,
}

impl MediaUrlSigner {
    pub fn new(secret: SecretString, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { secret, base_url }
    }

    pub fn signature(
        &self,
        tenant_id: &str,
        kind: MediaKind,
        asset_id: &str,
        expires_unix: i64,
    ) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("hmac accepts any key length");
        mac.update(
            format!("{tenant_id}:{}:{asset_id}:{expires_unix}", kind.as_str()).as_bytes(),
        );
        let digest = mac.finalize().into_bytes();
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// `GET /media/{asset_id}?sig=...&exp=...`
    pub fn signed_url(
        &self,
        tenant_id: &str,
        kind: MediaKind,
        asset_id: &str,
        expires_unix: i64,
    ) -> String {
        let sig = self.signature(tenant_id, kind, asset_id, expires_unix);
        format!("{}/media/{asset_id}?sig={sig}&exp={expires_unix}", self.base_url)
    }
}
