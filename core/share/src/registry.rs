//! Registry of expiring, access-limited file handles.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cloudshare_common::{Error, Result};

use crate::artifact::{ArtifactRemover, LocalArtifacts};
use crate::clock::{Clock, SystemClock};
use crate::record::{FileRecord, FileSummary, Registration};
use crate::store::{Files, SnapshotStore};

/// Store file name inside the registry's base directory.
pub const STORE_FILE_NAME: &str = "temp_files.json";

/// Durable mapping of handles to temporary file records.
///
/// Expiration is lazy: every operation first sweeps records whose expiry has
/// passed, removing them together with their artifacts. Every mutation is
/// written to disk before the call returns. A failed write leaves both the
/// store and the in-memory state as they were.
///
/// Access-exhausted records are not swept. `redeem` reports them as
/// `NotFound`, but `list` still shows them until `purge_exhausted` runs.
pub struct TempFileRegistry {
    store: SnapshotStore,
    files: Mutex<Files>,
    clock: Arc<dyn Clock>,
    artifacts: Arc<dyn ArtifactRemover>,
    recovered: Option<PathBuf>,
}

impl TempFileRegistry {
    /// Open the registry stored in `base_dir`, creating the directory if needed.
    /// Artifacts are local files.
    pub async fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir).await?;
        Ok(Self::open_with(
            base_dir.join(STORE_FILE_NAME),
            Arc::new(SystemClock),
            Arc::new(LocalArtifacts),
        )
        .await)
    }

    /// Open the registry at `store_path` with explicit clock and artifact remover.
    pub async fn open_with(
        store_path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        artifacts: Arc<dyn ArtifactRemover>,
    ) -> Self {
        let store = SnapshotStore::new(store_path);
        let loaded = store.load(clock.now()).await;

        info!(
            store = %store.path().display(),
            records = loaded.files.len(),
            "Opened temp file registry"
        );

        Self {
            store,
            files: Mutex::new(loaded.files),
            clock,
            artifacts,
            recovered: loaded.recovered,
        }
    }

    /// Path of the backing store file.
    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// Where a corrupt store was moved when this registry was opened.
    pub fn recovered_from_corruption(&self) -> Option<&Path> {
        self.recovered.as_deref()
    }

    /// Register an artifact for time- and access-limited sharing.
    ///
    /// `access_limit <= 0` means unlimited redemptions.
    ///
    /// # Preconditions
    /// - `stored_path` and `original_name` are non-empty
    /// - `expiration_minutes` is at least 1
    ///
    /// # Postconditions
    /// - The record is on disk with `access_count == 0` before this returns
    /// - Records that had already expired are gone, along with their artifacts
    ///
    /// # Errors
    /// - `InvalidInput` for an empty path or name, or `expiration_minutes <= 0`
    /// - `AlreadyExists` if the generated handle is already taken
    /// - `Io` / `Serialization` if the store could not be written
    pub async fn register(
        &self,
        stored_path: &str,
        original_name: &str,
        expiration_minutes: i64,
        access_limit: i64,
    ) -> Result<Registration> {
        if stored_path.is_empty() || original_name.is_empty() {
            return Err(Error::InvalidInput(
                "Stored path and original name must not be empty".to_string(),
            ));
        }
        if expiration_minutes <= 0 {
            return Err(Error::InvalidInput(format!(
                "Expiration must be at least one minute, got {}",
                expiration_minutes
            )));
        }

        let now = self.clock.now();
        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            stored_path: stored_path.to_string(),
            original_name: original_name.to_string(),
            created_at: now,
            expires_at: now + expiration_minutes as f64 * 60.0,
            access_limit,
            access_count: 0,
        };
        let registration = Registration {
            handle: record.id.clone(),
            expires_at: record.expires_at,
            access_limit,
        };

        let mut files = self.files.lock().await;
        let mut next = files.clone();
        let expired = take_expired(&mut next, now);

        if next.contains_key(&record.id) {
            return Err(Error::AlreadyExists(format!(
                "Handle {} is already registered",
                record.id
            )));
        }
        next.insert(record.id.clone(), record);

        self.store.save(&next).await?;
        *files = next;
        drop(files);

        debug!(handle = %registration.handle, name = original_name, "Registered temp file");
        self.remove_artifacts(expired).await;
        Ok(registration)
    }

    /// Consume one redemption of `handle`.
    ///
    /// Returns the record with its access count already incremented.
    ///
    /// # Preconditions
    /// - `handle` came from `register` and is neither expired nor exhausted
    ///
    /// # Postconditions
    /// - On success the incremented count is on disk before this returns
    /// - On `NotFound` the record is untouched
    ///
    /// # Errors
    /// - `NotFound` if the handle is absent, expired or access-exhausted
    /// - `Io` / `Serialization` if the store could not be written
    pub async fn redeem(&self, handle: &str) -> Result<FileRecord> {
        let now = self.clock.now();
        let mut files = self.files.lock().await;
        let mut next = files.clone();
        let expired = take_expired(&mut next, now);

        let outcome = match next.get_mut(handle) {
            Some(record) if !record.is_exhausted() => {
                record.access_count += 1;
                Ok(record.clone())
            }
            Some(_) => Err(Error::NotFound(format!(
                "Temp file {} has reached its access limit",
                handle
            ))),
            None => Err(Error::NotFound(format!("Temp file {} not found or expired", handle))),
        };

        if outcome.is_ok() || !expired.is_empty() {
            self.store.save(&next).await?;
            *files = next;
        }
        drop(files);

        if let Ok(record) = &outcome {
            debug!(handle, access_count = record.access_count, "Redeemed temp file");
        }
        self.remove_artifacts(expired).await;
        outcome
    }

    /// Remove `handle` and its artifact.
    ///
    /// Returns `false` if there was no live record. Artifact deletion is best
    /// effort and does not affect the result.
    pub async fn remove(&self, handle: &str) -> Result<bool> {
        let now = self.clock.now();
        let mut files = self.files.lock().await;
        let mut next = files.clone();
        let mut doomed = take_expired(&mut next, now);

        let removed = next.remove(handle);
        let existed = removed.is_some();
        doomed.extend(removed);

        if !doomed.is_empty() {
            self.store.save(&next).await?;
            *files = next;
        }
        drop(files);

        if existed {
            debug!(handle, "Removed temp file");
        }
        self.remove_artifacts(doomed).await;
        Ok(existed)
    }

    /// Summaries of all live records, oldest first.
    pub async fn list(&self) -> Result<Vec<FileSummary>> {
        let now = self.clock.now();
        let mut files = self.files.lock().await;
        let mut next = files.clone();
        let expired = take_expired(&mut next, now);

        if !expired.is_empty() {
            self.store.save(&next).await?;
            *files = next;
        }

        let mut summaries: Vec<FileSummary> = files.values().map(|r| r.summary(now)).collect();
        drop(files);

        summaries.sort_by(|a, b| {
            a.created_at
                .total_cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        self.remove_artifacts(expired).await;
        Ok(summaries)
    }

    /// Remove every expired record now. Returns how many were removed.
    pub async fn sweep(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut files = self.files.lock().await;
        let mut next = files.clone();
        let expired = take_expired(&mut next, now);

        if expired.is_empty() {
            return Ok(0);
        }
        self.store.save(&next).await?;
        *files = next;
        drop(files);

        let count = expired.len();
        info!(count, "Swept expired temp files");
        self.remove_artifacts(expired).await;
        Ok(count)
    }

    /// Remove every access-exhausted record, along with any expired ones.
    /// Returns how many records were removed in total.
    pub async fn purge_exhausted(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut files = self.files.lock().await;
        let mut next = files.clone();
        let mut doomed = take_expired(&mut next, now);

        let exhausted: Vec<String> = next
            .values()
            .filter(|r| r.is_exhausted())
            .map(|r| r.id.clone())
            .collect();
        doomed.extend(exhausted.iter().filter_map(|id| next.remove(id)));

        if doomed.is_empty() {
            return Ok(0);
        }
        self.store.save(&next).await?;
        *files = next;
        drop(files);

        let count = doomed.len();
        info!(count, exhausted = exhausted.len(), "Purged temp files");
        self.remove_artifacts(doomed).await;
        Ok(count)
    }

    async fn remove_artifacts(&self, records: Vec<FileRecord>) {
        for record in records {
            if !self.artifacts.remove(&record.stored_path).await {
                warn!(handle = %record.id, path = %record.stored_path, "Artifact left behind");
            }
        }
    }
}

fn take_expired(files: &mut Files, now: f64) -> Vec<FileRecord> {
    let expired: Vec<String> = files
        .values()
        .filter(|r| r.is_expired(now))
        .map(|r| r.id.clone())
        .collect();
    expired.iter().filter_map(|id| files.remove(id)).collect()
}
