//! Behavior shared by the flat-namespace object-store backends.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use cloudshare_common::{Error, Result};

use crate::backend::{RemoteFile, UploadResult};
use crate::client::ObjectClient;

/// Longest lifetime of an S3 or GCS V4 signed URL (7 days).
pub(crate) const V4_MAX_SIGNED_MINUTES: u32 = 7 * 24 * 60;

/// One bucket or container reached through an `ObjectClient`.
pub(crate) struct ObjectStore {
    provider: &'static str,
    container: String,
    client: Arc<dyn ObjectClient>,
    max_link_minutes: Option<u32>,
}

impl ObjectStore {
    /// `max_link_minutes` caps signed link lifetimes; `None` means no cap.
    pub(crate) fn new(
        provider: &'static str,
        container: &str,
        client: Arc<dyn ObjectClient>,
        max_link_minutes: Option<u32>,
    ) -> Self {
        Self {
            provider,
            container: container.to_string(),
            client,
            max_link_minutes,
        }
    }

    pub(crate) fn container(&self) -> &str {
        &self.container
    }

    pub(crate) async fn upload(&self, local_path: &Path, key: &str) -> UploadResult {
        if key.is_empty() {
            return UploadResult::failed(self.provider, key, "Destination key must not be empty");
        }

        let data = match fs::read(local_path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(provider = self.provider, path = %local_path.display(), error = %e, "Cannot read upload source");
                return UploadResult::failed(
                    self.provider,
                    key,
                    format!("Cannot read {}: {}", local_path.display(), e),
                );
            }
        };

        let size = data.len();
        match self.client.put_object(key, data).await {
            Ok(()) => {
                debug!(provider = self.provider, container = %self.container, key, size, "Uploaded object");
                UploadResult::stored(self.provider, key).in_container(&self.container)
            }
            Err(e) => {
                warn!(provider = self.provider, key, error = %e, "Upload failed");
                UploadResult::failed(self.provider, key, e)
            }
        }
    }

    pub(crate) async fn signed_link(&self, key: &str, expiration_minutes: u32) -> Result<String> {
        if expiration_minutes == 0 {
            return Err(Error::LinkGeneration(
                "expiration must be at least 1 minute".to_string(),
            ));
        }
        if let Some(max) = self.max_link_minutes.filter(|max| expiration_minutes > *max) {
            return Err(Error::LinkGeneration(format!(
                "expiration must be at most {} minutes, got {}",
                max, expiration_minutes
            )));
        }

        let ttl = Duration::from_secs(u64::from(expiration_minutes) * 60);
        self.client.presigned_get(key, ttl).await.map_err(|e| {
            warn!(provider = self.provider, key, error = %e, "Signing failed");
            Error::LinkGeneration(e.to_string())
        })
    }

    pub(crate) async fn delete(&self, key: &str) -> bool {
        match self.client.delete_object(key).await {
            Ok(()) => {
                debug!(provider = self.provider, key, "Deleted object");
                true
            }
            Err(e) => {
                warn!(provider = self.provider, key, error = %e, "Delete failed");
                false
            }
        }
    }

    pub(crate) async fn list(&self, prefix: &str) -> Vec<RemoteFile> {
        match self.client.list_objects(prefix).await {
            Ok(objects) => objects
                .into_iter()
                .map(|object| RemoteFile {
                    name: object.key.clone(),
                    size: object.size,
                    last_modified: object.last_modified,
                    path: object.key,
                })
                .collect(),
            Err(e) => {
                warn!(provider = self.provider, prefix, error = %e, "Error listing files");
                Vec::new()
            }
        }
    }
}

/// Check a bucket or container name against the common vendor rules:
/// 3-63 characters of lowercase letters, digits, `-` (and `.` when
/// `allow_dots`), starting and ending with a letter or digit.
pub(crate) fn validate_container_name(name: &str, allow_dots: bool) -> Result<()> {
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let body_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || (allow_dots && c == '.'));

    if (3..=63).contains(&name.len()) && body_ok && edge_ok(name.chars().next()) && edge_ok(name.chars().last()) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "Invalid bucket or container name '{}'",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectClient;

    #[test]
    fn test_container_name_rules() {
        assert!(validate_container_name("my-bucket.v2", true).is_ok());
        assert!(validate_container_name("my-bucket.v2", false).is_err());
        assert!(validate_container_name("ab", true).is_err());
        assert!(validate_container_name("Uploads", true).is_err());
        assert!(validate_container_name("-uploads", true).is_err());
        assert!(validate_container_name("uploads-", true).is_err());
    }

    #[tokio::test]
    async fn test_upload_missing_source_fails_softly() {
        let store = ObjectStore::new("aws_s3", "bucket", Arc::new(MemoryObjectClient::new("bucket")), None);
        let result = store.upload(Path::new("/definitely/not/here.bin"), "here.bin").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Cannot read"));
    }

    #[tokio::test]
    async fn test_signed_link_bounds() {
        let client = Arc::new(MemoryObjectClient::new("bucket"));
        let capped = ObjectStore::new("aws_s3", "bucket", client.clone(), Some(V4_MAX_SIGNED_MINUTES));
        assert!(matches!(
            capped.signed_link("a.txt", 0).await,
            Err(Error::LinkGeneration(_))
        ));
        assert!(capped.signed_link("a.txt", V4_MAX_SIGNED_MINUTES + 1).await.is_err());
        assert!(capped.signed_link("a.txt", V4_MAX_SIGNED_MINUTES).await.is_ok());

        let uncapped = ObjectStore::new("azure_blob", "bucket", client, None);
        assert!(uncapped.signed_link("a.txt", 0).await.is_err());
        assert!(uncapped.signed_link("a.txt", V4_MAX_SIGNED_MINUTES * 10).await.is_ok());
    }
}
