//! In-memory vendor clients for testing.
//!
//! All data is stored in memory and lost on drop. Each fake can be switched
//! into a failing mode to exercise the error paths of the backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use cloudshare_common::{Error, Result};

use crate::client::{Connector, ObjectClient, ObjectInfo};
use crate::descriptor::BackendDescriptor;
use crate::gdrive::{DriveApi, DriveFile, FOLDER_MIME_TYPE};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn check(failing: &AtomicBool) -> Result<()> {
    if failing.load(Ordering::SeqCst) {
        Err(Error::Unavailable("memory client is failing".to_string()))
    } else {
        Ok(())
    }
}

/// In-memory object store bound to one container.
pub struct MemoryObjectClient {
    container: String,
    objects: RwLock<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
    failing: AtomicBool,
}

impl MemoryObjectClient {
    /// Create an empty store for `container`.
    pub fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            objects: RwLock::new(BTreeMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Content stored under `key`.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        read(&self.objects).get(key).map(|(data, _)| data.clone())
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
        check(&self.failing)?;
        write(&self.objects).insert(key.to_string(), (data, Utc::now()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        check(&self.failing)?;
        // Object stores treat deleting a missing key as success.
        write(&self.objects).remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        check(&self.failing)?;
        Ok(read(&self.objects)
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, (data, modified))| ObjectInfo {
                key: key.clone(),
                size: data.len() as u64,
                last_modified: Some(*modified),
            })
            .collect())
    }

    async fn presigned_get(&self, key: &str, ttl: Duration) -> Result<String> {
        check(&self.failing)?;
        let mut url = Url::parse(&format!("memory://{}/", self.container))
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        url.set_path(key);
        url.query_pairs_mut()
            .append_pair("expires_in", &ttl.as_secs().to_string());
        Ok(url.to_string())
    }
}

#[derive(Default)]
struct DriveState {
    files: HashMap<String, (DriveFile, Vec<u8>)>,
    public: HashSet<String>,
}

/// In-memory Drive.
#[derive(Default)]
pub struct MemoryDrive {
    state: RwLock<DriveState>,
    failing: AtomicBool,
    folders_created: AtomicUsize,
    folder_lookups: AtomicUsize,
}

impl MemoryDrive {
    /// Create an empty drive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Whether `file_id` has been shared with anyone.
    pub fn is_public(&self, file_id: &str) -> bool {
        read(&self.state).public.contains(file_id)
    }

    /// Number of folders created so far.
    pub fn folders_created(&self) -> usize {
        self.folders_created.load(Ordering::SeqCst)
    }

    /// Number of `find_folder` calls so far.
    pub fn folder_lookups(&self) -> usize {
        self.folder_lookups.load(Ordering::SeqCst)
    }

    fn insert(&self, name: &str, mime_type: &str, parent_id: Option<&str>, data: Vec<u8>) -> DriveFile {
        let id = Uuid::new_v4().simple().to_string();
        let is_folder = mime_type == FOLDER_MIME_TYPE;
        let file = DriveFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: (!is_folder).then(|| data.len().to_string()),
            modified_time: Some(Utc::now()),
            parents: parent_id.map(|p| vec![p.to_string()]).unwrap_or_default(),
            web_content_link: (!is_folder)
                .then(|| format!("https://drive.example/uc?id={}&export=download", id)),
            web_view_link: Some(format!("https://drive.example/file/d/{}/view", id)),
            trashed: false,
            id,
        };
        write(&self.state)
            .files
            .insert(file.id.clone(), (file.clone(), data));
        file
    }

    fn under(file: &DriveFile, parent_id: Option<&str>) -> bool {
        match parent_id {
            Some(parent) => file.parents.iter().any(|p| p == parent),
            None => file.parents.is_empty(),
        }
    }
}

#[async_trait]
impl DriveApi for MemoryDrive {
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<DriveFile>> {
        check(&self.failing)?;
        self.folder_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(read(&self.state)
            .files
            .values()
            .map(|(file, _)| file)
            .find(|f| f.is_folder() && !f.trashed && f.name == name && Self::under(f, parent_id))
            .cloned())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        check(&self.failing)?;
        self.folders_created.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent resolvers interleave like they would over the network.
        tokio::task::yield_now().await;
        Ok(self.insert(name, FOLDER_MIME_TYPE, parent_id, Vec::new()))
    }

    async fn create_file(&self, name: &str, parent_id: Option<&str>, data: Vec<u8>) -> Result<DriveFile> {
        check(&self.failing)?;
        Ok(self.insert(name, "application/octet-stream", parent_id, data))
    }

    async fn share_publicly(&self, file_id: &str) -> Result<()> {
        check(&self.failing)?;
        let mut state = write(&self.state);
        if !state.files.contains_key(file_id) {
            return Err(Error::NotFound(format!("File not found: {}", file_id)));
        }
        state.public.insert(file_id.to_string());
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        check(&self.failing)?;
        read(&self.state)
            .files
            .get(file_id)
            .map(|(file, _)| file.clone())
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", file_id)))
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        check(&self.failing)?;
        let mut state = write(&self.state);
        state.public.remove(file_id);
        state
            .files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", file_id)))
    }

    async fn list_files(&self, parent_id: Option<&str>) -> Result<Vec<DriveFile>> {
        check(&self.failing)?;
        let mut files: Vec<DriveFile> = read(&self.state)
            .files
            .values()
            .map(|(file, _)| file)
            .filter(|f| !f.trashed && parent_id.map_or(true, |p| f.parents.iter().any(|q| q == p)))
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

/// Connector that hands out in-memory clients.
///
/// Object clients are created per container and shared across calls, so a
/// test can inspect what a registry-built backend wrote.
#[derive(Default)]
pub struct MemoryConnector {
    objects: RwLock<HashMap<String, Arc<MemoryObjectClient>>>,
    drive: Arc<MemoryDrive>,
}

impl MemoryConnector {
    /// Create a connector with no clients yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Object client for `container`, created on first use.
    pub fn objects(&self, container: &str) -> Arc<MemoryObjectClient> {
        write(&self.objects)
            .entry(container.to_string())
            .or_insert_with(|| Arc::new(MemoryObjectClient::new(container)))
            .clone()
    }

    /// The shared drive.
    pub fn drive(&self) -> Arc<MemoryDrive> {
        self.drive.clone()
    }
}

impl Connector for MemoryConnector {
    fn object_client(&self, descriptor: &BackendDescriptor) -> Result<Arc<dyn ObjectClient>> {
        let container = descriptor.container().ok_or_else(|| {
            Error::Configuration(format!("{} has no container", descriptor.kind()))
        })?;
        Ok(self.objects(container))
    }

    fn drive_client(&self, _descriptor: &BackendDescriptor) -> Result<Arc<dyn DriveApi>> {
        Ok(self.drive.clone())
    }
}
