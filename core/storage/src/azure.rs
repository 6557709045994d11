//! Azure Blob Storage backend.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use cloudshare_common::{Error, Result};

use crate::backend::{RemoteFile, StorageBackend, UploadResult};
use crate::client::ObjectClient;
use crate::credentials::AzureConnection;
use crate::descriptor::{BackendDescriptor, Credentials, ProviderKind};
use crate::object::{validate_container_name, ObjectStore};

/// Azure container backend. Links carry a read-only SAS token.
pub struct AzureBackend {
    descriptor: Arc<BackendDescriptor>,
    store: ObjectStore,
}

impl AzureBackend {
    /// Create a new Azure backend over `client`.
    ///
    /// # Errors
    /// - Descriptor is not an Azure descriptor
    /// - Connection string lacks an account name or key
    /// - Container name violates Azure naming rules
    pub fn new(descriptor: Arc<BackendDescriptor>, client: Arc<dyn ObjectClient>) -> Result<Self> {
        let container =
            match (descriptor.kind(), descriptor.container(), descriptor.credentials()) {
                (ProviderKind::Azure, Some(container), Credentials::ConnectionString(secret)) => {
                    AzureConnection::parse(secret.expose())?;
                    container.to_string()
                }
                _ => {
                    return Err(Error::Configuration(format!(
                        "{} descriptor cannot configure azure_blob",
                        descriptor.kind()
                    )))
                }
            };
        // Azure container names allow no dots and no consecutive hyphens.
        validate_container_name(&container, false)?;
        if container.contains("--") {
            return Err(Error::Configuration(format!(
                "Invalid container name '{}'",
                container
            )));
        }

        Ok(Self {
            store: ObjectStore::new(ProviderKind::Azure.name(), &container, client, None),
            descriptor,
        })
    }

    /// Container this backend writes to.
    pub fn container(&self) -> &str {
        self.store.container()
    }

    /// The descriptor this backend was built from.
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn name(&self) -> &str {
        ProviderKind::Azure.name()
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
