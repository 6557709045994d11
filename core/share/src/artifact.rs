//! Best-effort removal of the artifacts behind registry records.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use cloudshare_storage::StorageBackend;

/// Deletes the artifact a record points at.
///
/// Failures are reported as `false` and never propagate; the registry entry
/// is gone either way.
#[async_trait]
pub trait ArtifactRemover: Send + Sync {
    async fn remove(&self, stored_path: &str) -> bool;
}

/// Artifacts are files on the local filesystem.
///
/// A file that is already gone counts as removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArtifacts;

#[async_trait]
impl ArtifactRemover for LocalArtifacts {
    async fn remove(&self, stored_path: &str) -> bool {
        match fs::remove_file(stored_path).await {
            Ok(()) => {
                debug!(path = stored_path, "Removed artifact");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = stored_path, error = %e, "Failed to remove artifact");
                false
            }
        }
    }
}

/// Artifacts are keys in a storage backend.
pub struct BackendArtifacts {
    backend: Arc<dyn StorageBackend>,
}

impl BackendArtifacts {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ArtifactRemover for BackendArtifacts {
    async fn remove(&self, stored_path: &str) -> bool {
        self.backend.delete(stored_path).await
    }
}
