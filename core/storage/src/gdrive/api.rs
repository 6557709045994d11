//! Drive API surface used by the drive backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cloudshare_common::Result;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Drive file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// File size in bytes (only for files, not folders).
    #[serde(default)]
    pub size: Option<String>,
    /// Modified time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Direct download link (requires the file to be shared).
    #[serde(default)]
    pub web_content_link: Option<String>,
    /// Browser view link.
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// Trashed status.
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Operations the drive backend needs from a Drive client.
///
/// A `parent_id` of `None` means the drive root.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Find a non-trashed folder named `name` directly under `parent_id`.
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<DriveFile>>;

    /// Create a folder.
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile>;

    /// Create a file with the given content.
    async fn create_file(&self, name: &str, parent_id: Option<&str>, data: Vec<u8>) -> Result<DriveFile>;

    /// Grant read access to anyone with the link.
    async fn share_publicly(&self, file_id: &str) -> Result<()>;

    /// Get file metadata by ID.
    async fn get_file(&self, file_id: &str) -> Result<DriveFile>;

    /// Delete a file.
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// List non-trashed entries under `parent_id`, or everywhere when `None`.
    async fn list_files(&self, parent_id: Option<&str>) -> Result<Vec<DriveFile>>;
}
