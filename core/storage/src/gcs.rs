//! Google Cloud Storage backend.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use cloudshare_common::{Error, Result};

use crate::backend::{RemoteFile, StorageBackend, UploadResult};
use crate::client::ObjectClient;
use crate::credentials::ServiceAccountKey;
use crate::descriptor::{BackendDescriptor, Credentials, ProviderKind};
use crate::object::{validate_container_name, ObjectStore, V4_MAX_SIGNED_MINUTES};

/// GCS bucket backend. Links are V4 signed URLs.
pub struct GcsBackend {
    descriptor: Arc<BackendDescriptor>,
    store: ObjectStore,
}

impl GcsBackend {
    /// Create a new GCS backend over `client`.
    ///
    /// # Errors
    /// - Descriptor is not a GCS descriptor
    /// - Credentials file unreadable or not a service-account key
    /// - Bucket name violates GCS naming rules
    pub fn new(descriptor: Arc<BackendDescriptor>, client: Arc<dyn ObjectClient>) -> Result<Self> {
        let (bucket, key_file) = match (descriptor.kind(), descriptor.container(), descriptor.credentials()) {
            (ProviderKind::Gcs, Some(bucket), Credentials::KeyFile(path)) => (bucket.to_string(), path.clone()),
            _ => {
                return Err(Error::Configuration(format!(
                    "{} descriptor cannot configure google_cloud_storage",
                    descriptor.kind()
                )))
            }
        };
        validate_container_name(&bucket, true)?;
        ServiceAccountKey::from_file(&key_file)?;

        Ok(Self {
            store: ObjectStore::new(ProviderKind::Gcs.name(), &bucket, client, Some(V4_MAX_SIGNED_MINUTES)),
            descriptor,
        })
    }

    /// Bucket this backend writes to.
    pub fn bucket(&self) -> &str {
        self.store.container()
    }

    /// The descriptor this backend was built from.
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl StorageBackend for GcsBackend {
    fn name(&self) -> &str {
        ProviderKind::Gcs.name()
    }

    async fn upload(&self, local_path: &Path, destination_key: &str) -> UploadResult {
        self.store.upload(local_path, destination_key).await
    }

    async fn shareable_link(&self, key: &str, expiration_minutes: u32) -> Result<String> {
        self.store.signed_link(key, expiration_minutes).await
    }

    async fn delete(&self, key: &str) -> bool {
        self.store.delete(key).await
    }

    async fn list_files(&self, prefix: &str) -> Vec<RemoteFile> {
        self.store.list(prefix).await
    }
}
