//! Storage backend trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use cloudshare_common::Result;

/// Outcome of an upload.
///
/// Uploads never fail past the backend boundary; a vendor failure is
/// reported through `success = false` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Whether the object was stored.
    pub success: bool,
    /// Provider name (e.g., "aws_s3").
    pub provider: String,
    /// Key the caller asked to upload to.
    pub destination_key: String,
    /// Bucket or container the object landed in (object stores only).
    #[serde(default)]
    pub container: Option<String>,
    /// Backend-native file ID (drive only).
    #[serde(default)]
    pub file_id: Option<String>,
    /// Public content link (drive only).
    #[serde(default)]
    pub link: Option<String>,
    /// Description of the failure when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResult {
    /// A successful upload of `destination_key`.
    pub fn stored(provider: &str, destination_key: &str) -> Self {
        Self {
            success: true,
            provider: provider.to_string(),
            destination_key: destination_key.to_string(),
            container: None,
            file_id: None,
            link: None,
            error: None,
        }
    }

    /// A failed upload of `destination_key`.
    pub fn failed(provider: &str, destination_key: &str, error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::stored(provider, destination_key)
        }
    }

    /// Attach the bucket or container name.
    pub fn in_container(mut self, container: &str) -> Self {
        self.container = Some(container.to_string());
        self
    }
}

/// A file reported by `list_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Object key or file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// Handle to pass back to `delete` / `shareable_link`.
    pub path: String,
}

/// Uniform capability interface over the supported cloud backends.
///
/// Every operation is total at this boundary: vendor failures are logged and
/// normalized into the return value, except `shareable_link`, which reports
/// `Error::LinkGeneration`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Provider name (e.g., "aws_s3", "google_drive").
    fn name(&self) -> &str;

    /// Upload a local file to `destination_key`.
    async fn upload(&self, local_path: &Path, destination_key: &str) -> UploadResult;

    /// Produce a link granting read access to `key`.
    ///
    /// Object stores sign a URL valid for `expiration_minutes`. The drive
    /// backend has no expiring-link primitive: it grants public read access
    /// and returns a permanent content link, ignoring `expiration_minutes`.
    async fn shareable_link(&self, key: &str, expiration_minutes: u32) -> Result<String>;

    /// Delete `key`. Returns false on any backend error.
    async fn delete(&self, key: &str) -> bool;

    /// List files under `prefix`, in backend order. Empty on error.
    async fn list_files(&self, prefix: &str) -> Vec<RemoteFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_result_failed_keeps_key() {
        let result = UploadResult::failed("aws_s3", "docs/a.pdf", "access denied");
        assert!(!result.success);
        assert_eq!(result.destination_key, "docs/a.pdf");
        assert_eq!(result.error.as_deref(), Some("access denied"));
    }

    #[test]
    fn test_upload_result_serialization() {
        let result = UploadResult::stored("azure_blob", "a.txt").in_container("uploads");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["container"], "uploads");
        assert_eq!(json["success"], true);

        let restored: UploadResult = serde_json::from_value(json).unwrap();
        assert_eq!(restored, result);
    }
}
