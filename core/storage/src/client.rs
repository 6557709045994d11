//! Vendor client seams.
//!
//! Network transport to the cloud vendors is supplied by SDK adapters that
//! implement these traits. The backends in this crate only map the uniform
//! contract onto them and normalize their failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use cloudshare_common::Result;

use crate::descriptor::BackendDescriptor;
use crate::gdrive::DriveApi;

/// An object as reported by an object-store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Flat-namespace object store client (S3, GCS and Azure Blob style).
///
/// One client is bound to one bucket or container.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Store `data` under `key`.
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Remove `key`.
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// List objects whose key starts with `prefix`.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Produce a read-only URL for `key` that stops working after `ttl`.
    async fn presigned_get(&self, key: &str, ttl: Duration) -> Result<String>;
}

/// Builds vendor clients for validated descriptors.
pub trait Connector: Send + Sync {
    /// Client for an S3, GCS or Azure descriptor.
    fn object_client(&self, descriptor: &BackendDescriptor) -> Result<Arc<dyn ObjectClient>>;

    /// Client for a drive descriptor.
    fn drive_client(&self, descriptor: &BackendDescriptor) -> Result<Arc<dyn DriveApi>>;
}
