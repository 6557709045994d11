//! Folder path resolution for the drive backend.

use std::collections::HashMap;
use tracing::{debug, info};

use cloudshare_common::{FolderPath, Result};

use super::api::DriveApi;

/// Resolves nested folder paths to Drive folder IDs, creating missing folders.
///
/// A resolver lives for one call chain and memoizes every path prefix it
/// has resolved, so repeated lookups of shared prefixes hit the API once.
/// Resolution is idempotent when run sequentially because each segment is
/// looked up before it is created. Two resolvers racing on the same missing
/// folder can both create it; callers serialize resolution to avoid that.
pub struct FolderResolver<'a> {
    api: &'a dyn DriveApi,
    memo: HashMap<String, String>,
}

impl<'a> FolderResolver<'a> {
    /// Create a resolver over `api`.
    pub fn new(api: &'a dyn DriveApi) -> Self {
        Self {
            api,
            memo: HashMap::new(),
        }
    }

    /// Resolve `path` to a folder ID. The root resolves to `None`.
    pub async fn resolve(&mut self, path: &FolderPath) -> Result<Option<String>> {
        let mut parent: Option<String> = None;

        for (depth, segment) in path.segments().iter().enumerate() {
            let prefix = path.prefix(depth + 1);

            if let Some(id) = self.memo.get(&prefix) {
                parent = Some(id.clone());
                continue;
            }

            let id = match self.api.find_folder(segment, parent.as_deref()).await? {
                Some(existing) => existing.id,
                None => {
                    let created = self.api.create_folder(segment, parent.as_deref()).await?;
                    info!(folder = %prefix, id = %created.id, "Created drive folder");
                    created.id
                }
            };

            debug!(folder = %prefix, id = %id, "Resolved drive folder");
            self.memo.insert(prefix, id.clone());
            parent = Some(id);
        }

        Ok(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDrive;

    #[tokio::test]
    async fn test_root_resolves_to_none() {
        let drive = MemoryDrive::new();
        let mut resolver = FolderResolver::new(&drive);
        assert_eq!(resolver.resolve(&FolderPath::parse("/")).await.unwrap(), None);
        assert_eq!(drive.folders_created(), 0);
    }

    #[tokio::test]
    async fn test_sequential_resolution_is_idempotent() {
        let drive = MemoryDrive::new();
        let path = FolderPath::parse("a/b/c");

        let first = FolderResolver::new(&drive).resolve(&path).await.unwrap();
        let second = FolderResolver::new(&drive).resolve(&path).await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(drive.folders_created(), 3);
    }

    #[tokio::test]
    async fn test_shared_prefix_reuses_existing_folders() {
        let drive = MemoryDrive::new();
        let mut resolver = FolderResolver::new(&drive);

        let c = resolver.resolve(&FolderPath::parse("a/b/c")).await.unwrap();
        let d = resolver.resolve(&FolderPath::parse("a/b/d")).await.unwrap();

        assert_ne!(c, d);
        assert_eq!(drive.folders_created(), 4);
    }

    #[tokio::test]
    async fn test_memo_avoids_repeat_lookups() {
        let drive = MemoryDrive::new();
        let mut resolver = FolderResolver::new(&drive);

        resolver.resolve(&FolderPath::parse("x/y")).await.unwrap();
        let lookups = drive.folder_lookups();
        resolver.resolve(&FolderPath::parse("x/y")).await.unwrap();

        assert_eq!(drive.folder_lookups(), lookups);
    }

    #[tokio::test]
    async fn test_same_name_under_different_parents() {
        let drive = MemoryDrive::new();
        let mut resolver = FolderResolver::new(&drive);

        let left = resolver.resolve(&FolderPath::parse("left/shared")).await.unwrap();
        let right = resolver.resolve(&FolderPath::parse("right/shared")).await.unwrap();

        assert_ne!(left, right);
        assert_eq!(drive.folders_created(), 4);
    }
}
