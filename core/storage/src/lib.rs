//! Cloud storage backends for cloudshare.
//!
//! A uniform `StorageBackend` contract over S3, Google Cloud Storage, Azure
//! Blob Storage and Google Drive, plus a `BackendRegistry` that resolves a
//! provider name to a configured backend.
//!
//! # Design Principles
//! - Backend isolation: vendor specifics stay behind `ObjectClient` and `DriveApi`
//! - Async operations: all I/O is async
//! - Normalized failures: backend errors become result values, never panics

pub mod azure;
pub mod backend;
pub mod client;
pub mod credentials;
pub mod descriptor;
pub mod gcs;
pub mod gdrive;
pub mod memory;
mod object;
pub mod registry;
pub mod s3;

pub use azure::AzureBackend;
pub use backend::{RemoteFile, StorageBackend, UploadResult};
pub use client::{Connector, ObjectClient, ObjectInfo};
pub use descriptor::{BackendDescriptor, ConfigSource, Credentials, EnvConfig, ProviderKind};
pub use gcs::GcsBackend;
pub use gdrive::{DriveApi, DriveClient, DriveFile, FolderResolver, GDriveBackend};
pub use memory::{MemoryConnector, MemoryDrive, MemoryObjectClient};
pub use registry::{create_default_registry, BackendFactory, BackendRegistry};
pub use s3::S3Backend;
