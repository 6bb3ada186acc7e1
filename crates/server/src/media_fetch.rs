//! Default media adapters for single-box deployments: an HTTP fetcher that
//! expects the provider adapter to have resolved `source_ref` into a
//! download URL, and a filesystem object store. S3-compatible storage and
//! provider-specific fetchers plug in behind the same traits.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use movely_core::{CredentialMap, Provider};
use movely_worker::{DeliveryError, FetchedMedia, MediaFetcher, ObjectStore};

pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpMediaFetcher {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|error| DeliveryError::Permanent(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(
        &self,
        _provider: Provider,
        credentials: &CredentialMap,
        source_ref: &str,
    ) -> Result<FetchedMedia, DeliveryError> {
        if !source_ref.starts_with("http://") && !source_ref.starts_with("https://") {
            return Err(DeliveryError::Permanent(format!(
                "source_ref is not a resolvable URL: {source_ref}"
            )));
        }

        let mut request = self.client.get(source_ref);
        if let Some(token) = credentials.get("auth_token") {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| DeliveryError::Transient(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(DeliveryError::Transient(format!("status {status}")));
            }
            return Err(DeliveryError::Permanent(format!("status {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| DeliveryError::Transient(error.to_string()))?;

        Ok(FetchedMedia { bytes: bytes.to_vec(), content_type })
    }
}

/// Filesystem object store rooted at a base directory.
pub struct FsObjectStore {
    base: PathBuf,
}

impl FsObjectStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DeliveryError> {
        // Keys are generated internally; reject anything path-shaped anyway.
        if key.split('/').any(|segment| segment == ".." || segment.is_empty()) {
            return Err(DeliveryError::Permanent(format!("invalid object key {key}")));
        }
        Ok(self.base.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), DeliveryError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| DeliveryError::Transient(error.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| DeliveryError::Transient(error.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), DeliveryError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Already gone: cleanup is idempotent.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(DeliveryError::Transient(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_store_round_trips_objects() {
        let dir = std::env::temp_dir().join(format!("movely-store-{}", uuid::Uuid::new_v4()));
        let store = FsObjectStore::new(&dir);

        store.put("media/t-1/lead/asset.jpg", vec![1, 2, 3], "image/jpeg").await.unwrap();
        let stored = tokio::fs::read(dir.join("media/t-1/lead/asset.jpg")).await.unwrap();
        assert_eq!(stored, vec![1, 2, 3]);

        store.delete("media/t-1/lead/asset.jpg").await.unwrap();
        // Idempotent second delete.
        store.delete("media/t-1/lead/asset.jpg").await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let store = FsObjectStore::new("/tmp/movely-test");
        let error = store.put("media/../../etc/passwd", vec![0], "x").await.unwrap_err();
        assert!(matches!(error, DeliveryError::Permanent(_)));
    }

    #[tokio::test]
    async fn non_url_source_ref_is_permanent() {
        let fetcher = HttpMediaFetcher::new().unwrap();
        let error = fetcher
            .fetch(Provider::Meta, &CredentialMap::new(), "media-id-123")
            .await
            .unwrap_err();
        assert!(matches!(error, DeliveryError::Permanent(_)));
    }
}
