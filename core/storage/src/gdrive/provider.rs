//! Google Drive storage backend implementation.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use cloudshare_common::{Error, FolderPath, Result};

use crate::backend::{RemoteFile, StorageBackend, UploadResult};
use crate::credentials::ServiceAccountKey;
use crate::descriptor::{BackendDescriptor, Credentials, ProviderKind};

use super::api::DriveApi;
use super::folder::FolderResolver;

/// Google Drive storage backend.
///
/// Drive addresses files by ID rather than by key: `upload` reports the new
/// file ID, and `shareable_link` / `delete` take that ID. Drive has no
/// expiring-link primitive, so links are permanent public content links.
pub struct GDriveBackend {
    descriptor: Arc<BackendDescriptor>,
    api: Arc<dyn DriveApi>,
    /// Serializes folder creation inside this process.
    resolve_lock: Mutex<()>,
}

impl GDriveBackend {
    /// Create a new drive backend.
    ///
    /// # Errors
    /// - Descriptor is not a drive descriptor
    /// - Service-account key missing or malformed
    pub fn new(descriptor: Arc<BackendDescriptor>, api: Arc<dyn DriveApi>) -> Result<Self> {
        match descriptor.credentials() {
            Credentials::ServiceAccount { path, inline_json } if descriptor.kind() == ProviderKind::GDrive => {
                ServiceAccountKey::from_path_or_json(path.as_deref(), inline_json.as_ref())?;
            }
            _ => {
                return Err(Error::Configuration(format!(
                    "{} descriptor cannot configure google_drive",
                    descriptor.kind()
                )))
            }
        }

        Ok(Self {
            descriptor,
            api,
            resolve_lock: Mutex::new(()),
        })
    }

    /// The descriptor this backend was built from.
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    /// Resolve `folder` to a Drive folder ID (None = root).
    async fn resolve_folder(&self, folder: &FolderPath) -> Result<Option<String>> {
        if folder.is_root() {
            return Ok(None);
        }
        let _guard = self.resolve_lock.lock().await;
        FolderResolver::new(self.api.as_ref()).resolve(folder).await
    }

    async fn try_upload(&self, local_path: &Path, destination_key: &str) -> Result<UploadResult> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("No file name in {}", local_path.display()))
            })?;

        let data = fs::read(local_path).await?;
        let parent_id = self
            .resolve_folder(&FolderPath::parent_of_key(destination_key))
            .await?;

        let file = self
            .api
            .create_file(file_name, parent_id.as_deref(), data)
            .await?;
        self.api.share_publicly(&file.id).await?;

        debug!(file_id = %file.id, name = file_name, "Uploaded drive file");

        let mut result = UploadResult::stored(self.name(), destination_key);
        result.link = file.web_content_link.clone();
        result.file_id = Some(file.id);
        Ok(result)
    }

    async fn try_link(&self, file_id: &str) -> Result<String> {
        self.api.share_publicly(file_id).await?;
        let file = self.api.get_file(file_id).await?;
        file.web_content_link
            .ok_or_else(|| Error::NotFound("Could not generate shareable link for this file".to_string()))
    }

    async fn try_list(&self, prefix: &str) -> Result<Vec<RemoteFile>> {
        let folder_id = self.resolve_folder(&FolderPath::parse(prefix)).await?;
        let files = self.api.list_files(folder_id.as_deref()).await?;

        Ok(files
            .into_iter()
            .filter(|file| !file.is_folder())
            .map(|file| RemoteFile {
                size: file.size_bytes().unwrap_or(0),
                last_modified: file.modified_time,
                name: file.name,
                path: file.id,
            })
            .collect())
    }
}

#[async_trait]
impl StorageBackend for GDriveBackend {
    fn name(&self) -> &str {
        ProviderKind::GDrive.name()
    }

    async fn upload(&self, local_path: &Path, destination_key: &str) -> UploadResult {
        match self.try_upload(local_path, destination_key).await {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %local_path.display(), destination_key, error = %e, "Drive upload failed");
                UploadResult::failed(self.name(), destination_key, e)
            }
        }
    }

    async fn shareable_link(&self, key: &str, _expiration_minutes: u32) -> Result<String> {
        self.try_link(key).await.map_err(|e| {
            warn!(file_id = key, error = %e, "Drive link generation failed");
            Error::LinkGeneration(e.to_string())
        })
    }

    async fn delete(&self, key: &str) -> bool {
        match self.api.delete_file(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(file_id = key, error = %e, "Drive delete failed");
                false
            }
        }
    }

    async fn list_files(&self, prefix: &str) -> Vec<RemoteFile> {
        match self.try_list(prefix).await {
            Ok(files) => files,
            Err(e) => {
                warn!(prefix, error = %e, "Error listing drive files");
                Vec::new()
            }
        }
    }
}
