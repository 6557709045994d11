//! JSON snapshot persistence for the registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use cloudshare_common::{Error, Result};

use crate::record::FileRecord;

pub(crate) type Files = BTreeMap<String, FileRecord>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    files: Files,
}

/// Outcome of loading the store file.
pub(crate) struct Loaded {
    pub files: Files,
    /// Set when a corrupt store was moved aside.
    pub recovered: Option<PathBuf>,
}

/// Whole-file JSON store: `{"files": {<id>: <record>}}`.
pub(crate) struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing file is an empty store; an unreadable
    /// or unparseable one is moved aside and also yields an empty store.
    pub async fn load(&self, now: f64) -> Loaded {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Loaded {
                    files: Files::new(),
                    recovered: None,
                }
            }
            Err(e) => return self.recover(Error::Io(e), now).await,
        };

        match serde_json::from_slice::<Snapshot>(&content)
            .map_err(|e| Error::Corruption(e.to_string()))
            .and_then(|snapshot| check_keys(snapshot.files))
        {
            Ok(files) => Loaded {
                files,
                recovered: None,
            },
            Err(e) => self.recover(e, now).await,
        }
    }

    async fn recover(&self, cause: Error, now: f64) -> Loaded {
        let aside = PathBuf::from(format!("{}.corrupt-{}", self.path.display(), now as i64));
        error!(
            store = %self.path.display(),
            moved_to = %aside.display(),
            error = %cause,
            "Temp file store is corrupt, starting empty"
        );
        if let Err(e) = fs::rename(&self.path, &aside).await {
            warn!(store = %self.path.display(), error = %e, "Could not move corrupt store aside");
        }
        Loaded {
            files: Files::new(),
            recovered: Some(aside),
        }
    }

    /// Rewrite the whole store. The previous snapshot survives a crash at
    /// any point before the final rename.
    pub async fn save(&self, files: &Files) -> Result<()> {
        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            files: &'a Files,
        }

        let json = serde_json::to_vec(&SnapshotRef { files })?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await?;
        sync_parent(&self.path).await
    }
}

/// Flush the directory entry written by a rename.
#[cfg(unix)]
async fn sync_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::File::open(dir).await?.sync_all().await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

fn check_keys(files: Files) -> Result<Files> {
    match files.iter().find(|(key, record)| **key != record.id) {
        Some((key, _)) => Err(Error::Corruption(format!(
            "record stored under '{}' has a different id",
            key
        ))),
        None => Ok(files),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            stored_path: format!("/tmp/{}", id),
            original_name: "a.txt".to_string(),
            created_at: 1.0,
            expires_at: 61.0,
            access_limit: -1,
            access_count: 0,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let loaded = SnapshotStore::new(temp.path().join("temp_files.json")).load(0.0).await;
        assert!(loaded.files.is_empty());
        assert!(loaded.recovered.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("temp_files.json"));
        let files = Files::from([("a".to_string(), record("a"))]);

        store.save(&files).await.unwrap();
        assert!(!temp.path().join("temp_files.json.tmp").exists());

        let loaded = store.load(0.0).await;
        assert_eq!(loaded.files, files);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["files"]["a"]["path"], "/tmp/a");
    }

    #[tokio::test]
    async fn test_save_overwrites_in_place() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("temp_files.json"));

        store.save(&Files::from([("a".to_string(), record("a"))])).await.unwrap();
        store.save(&Files::from([("b".to_string(), record("b"))])).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let loaded = store.load(0.0).await;
        assert_eq!(loaded.files.len(), 1);
        assert!(loaded.files.contains_key("b"));
    }

    #[tokio::test]
    async fn test_save_with_bare_file_name() {
        let name = format!("temp_files-{}.json", uuid::Uuid::new_v4());
        let store = SnapshotStore::new(&name);

        store.save(&Files::new()).await.unwrap();
        assert!(Path::new(&name).exists());
        std::fs::remove_file(&name).unwrap();
    }

    #[tokio::test]
    async fn test_garbage_is_moved_aside() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("temp_files.json");
        std::fs::write(&path, b"{\"files\": {\"a\": ").unwrap();

        let loaded = SnapshotStore::new(&path).load(1234.0).await;
        assert!(loaded.files.is_empty());
        let aside = loaded.recovered.unwrap();
        assert_eq!(aside, temp.path().join("temp_files.json.corrupt-1234"));
        assert!(aside.exists());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_mismatched_key_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("temp_files.json");
        let body = serde_json::json!({ "files": { "a": record("b") } });
        std::fs::write(&path, body.to_string()).unwrap();

        assert!(SnapshotStore::new(&path).load(0.0).await.recovered.is_some());
    }

    #[tokio::test]
    async fn test_empty_object_is_empty_store() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("temp_files.json");
        std::fs::write(&path, b"{}").unwrap();

        let loaded = SnapshotStore::new(&path).load(0.0).await;
        assert!(loaded.files.is_empty());
        assert!(loaded.recovered.is_none());
    }
}
