//! AWS S3 storage backend.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use cloudshare_common::{Error, Result};

use crate::backend::{RemoteFile, StorageBackend, UploadResult};
use crate::client::ObjectClient;
use crate::descriptor::{BackendDescriptor, Credentials, ProviderKind};
use crate::object::{validate_container_name, ObjectStore, V4_MAX_SIGNED_MINUTES};

/// S3 bucket backend. Links are pre-signed GET URLs.
pub struct S3Backend {
    descriptor: Arc<BackendDescriptor>,
    store: ObjectStore,
}

impl S3Backend {
    /// Create a new S3 backend over `client`.
    ///
    /// # Errors
    /// - Descriptor is not an S3 descriptor
    /// - Bucket name violates S3 naming rules
    pub fn new(descriptor: Arc<BackendDescriptor>, client: Arc<dyn ObjectClient>) -> Result<Self> {
        let bucket = match (descriptor.kind(), descriptor.container(), descriptor.credentials()) {
            (ProviderKind::S3, Some(bucket), Credentials::AccessKey { .. }) => bucket.to_string(),
            _ => {
                return Err(Error::Configuration(format!(
                    "{} descriptor cannot configure aws_s3",
                    descriptor.kind()
                )))
            }
        };
        validate_container_name(&bucket, true)?;

        Ok(Self {
            store: ObjectStore::new(ProviderKind::S3.name(), &bucket, client, Some(V4_MAX_SIGNED_MINUTES)),
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
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        ProviderKind::S3.name()
    }

    async fn upload(&self, local_path: &Path, destination_key: &str) -> UploadResult {
        // S3 object keys are limited to 1024 bytes.
        if destination_key.len() > 1024 {
            return UploadResult::failed(self.name(), destination_key, "Object key exceeds 1024 bytes");
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AWS_ACCESS_KEY_ID, AWS_REGION, AWS_S3_BUCKET_NAME, AWS_SECRET_ACCESS_KEY};
    use crate::memory::MemoryObjectClient;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn descriptor(bucket: &str) -> Arc<BackendDescriptor> {
        let config: HashMap<String, String> = HashMap::from([
            (AWS_ACCESS_KEY_ID.to_string(), "AKIAEXAMPLE".to_string()),
            (AWS_SECRET_ACCESS_KEY.to_string(), "secret".to_string()),
            (AWS_S3_BUCKET_NAME.to_string(), bucket.to_string()),
            (AWS_REGION.to_string(), "eu-west-1".to_string()),
        ]);
        Arc::new(BackendDescriptor::from_config(ProviderKind::S3, &config).unwrap())
    }

    #[test]
    fn test_invalid_bucket_rejected() {
        let client = Arc::new(MemoryObjectClient::new("Bad_Bucket"));
        assert!(S3Backend::new(descriptor("Bad_Bucket"), client).is_err());
    }

    #[test]
    fn test_region_from_descriptor() {
        let backend =
            S3Backend::new(descriptor("uploads"), Arc::new(MemoryObjectClient::new("uploads"))).unwrap();
        assert!(matches!(
            backend.descriptor().credentials(),
            Credentials::AccessKey { region, .. } if region == "eu-west-1"
        ));
        assert_eq!(backend.bucket(), "uploads");
    }

    #[tokio::test]
    async fn test_upload_link_list_delete() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.pdf");
        std::fs::write(&source, b"%PDF-1.7").unwrap();

        let client = Arc::new(MemoryObjectClient::new("uploads"));
        let backend = S3Backend::new(descriptor("uploads"), client.clone()).unwrap();

        let result = backend.upload(&source, "docs/a.pdf").await;
        assert!(result.success);
        assert_eq!(result.provider, "aws_s3");
        assert_eq!(result.container.as_deref(), Some("uploads"));
        assert_eq!(client.object("docs/a.pdf").unwrap(), b"%PDF-1.7");

        let link = backend.shareable_link("docs/a.pdf", 15).await.unwrap();
        assert!(link.contains("expires_in=900"));

        let files = backend.list_files("docs/").await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "docs/a.pdf");
        assert_eq!(files[0].path, "docs/a.pdf");
        assert_eq!(files[0].size, 8);

        assert!(backend.delete("docs/a.pdf").await);
        assert!(backend.list_files("docs/").await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failures_are_normalized() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        std::fs::write(&source, b"a").unwrap();

        let client = Arc::new(MemoryObjectClient::new("uploads"));
        let backend = S3Backend::new(descriptor("uploads"), client.clone()).unwrap();
        client.set_failing(true);

        let result = backend.upload(&source, "a.txt").await;
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(!backend.delete("a.txt").await);
        assert!(backend.list_files("").await.is_empty());
        assert!(matches!(
            backend.shareable_link("a.txt", 60).await,
            Err(Error::LinkGeneration(_))
        ));
    }

    #[tokio::test]
    async fn test_overlong_key_rejected() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        std::fs::write(&source, b"a").unwrap();
        let backend =
            S3Backend::new(descriptor("uploads"), Arc::new(MemoryObjectClient::new("uploads"))).unwrap();

        let result = backend.upload(&source, &"k".repeat(1025)).await;
        assert!(!result.success);
    }
}
