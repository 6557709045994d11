//! Google Drive storage backend.
//!
//! This module provides a drive-style backend with:
//! - Nested folder resolution that creates missing folders
//! - Public sharing in place of expiring links
//! - A Drive v3 REST client behind the `DriveApi` seam

pub mod api;
pub mod client;
pub mod folder;
pub mod provider;

pub use api::{DriveApi, DriveFile, FOLDER_MIME_TYPE};
pub use client::{DriveClient, StaticToken, TokenSource};
pub use folder::FolderResolver;
pub use provider::GDriveBackend;
