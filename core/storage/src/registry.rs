//! Backend registry for resolving providers by name.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use cloudshare_common::{Error, Result};

use crate::azure::AzureBackend;
use crate::backend::StorageBackend;
use crate::client::Connector;
use crate::descriptor::{BackendDescriptor, ConfigSource, ProviderKind};
use crate::gcs::GcsBackend;
use crate::gdrive::GDriveBackend;
use crate::s3::S3Backend;

/// Factory function type for creating backends from a resolved descriptor.
pub type BackendFactory =
    Box<dyn Fn(Arc<BackendDescriptor>) -> Result<Arc<dyn StorageBackend>> + Send + Sync>;

/// Registry of backend factories.
///
/// Each provider's descriptor is read from configuration once, on first
/// resolution, and the constructed backend is reused afterwards.
pub struct BackendRegistry {
    config: Arc<dyn ConfigSource>,
    factories: HashMap<ProviderKind, BackendFactory>,
    backends: RwLock<HashMap<ProviderKind, Arc<dyn StorageBackend>>>,
}

impl BackendRegistry {
    /// Create an empty registry reading configuration from `config`.
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            config,
            factories: HashMap::new(),
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Register a backend factory.
    ///
    /// # Preconditions
    /// - `kind` has no factory in this registry yet
    ///
    /// # Postconditions
    /// - `resolve(kind.name())` runs `factory` on its first call
    ///
    /// # Errors
    /// - `AlreadyExists` if `kind` is already registered
    pub fn register(&mut self, kind: ProviderKind, factory: BackendFactory) -> Result<()> {
        if self.factories.contains_key(&kind) {
            return Err(Error::AlreadyExists(format!(
                "Provider '{}' is already registered",
                kind
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Resolve a backend by provider name.
    ///
    /// # Preconditions
    /// - A factory is registered for the provider
    /// - The configuration source holds every key the provider requires
    ///
    /// # Postconditions
    /// - The backend is built once and cached; later calls return the same instance
    ///
    /// # Errors
    /// Every failure is reported as `Error::Unavailable`: unknown or
    /// unregistered provider, missing configuration, rejected credentials.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn StorageBackend>> {
        self.try_resolve(name).map_err(|e| {
            warn!(provider = name, error = %e, "Storage provider unavailable");
            Error::Unavailable(format!("Storage provider '{}' is unavailable: {}", name, e))
        })
    }

    fn try_resolve(&self, name: &str) -> Result<Arc<dyn StorageBackend>> {
        let kind: ProviderKind = name.parse()?;

        if let Some(backend) = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
        {
            return Ok(backend.clone());
        }

        let factory = self.factories.get(&kind).ok_or_else(|| {
            Error::NotFound(format!("Provider '{}' is not registered", kind))
        })?;
        let descriptor = Arc::new(BackendDescriptor::from_config(kind, self.config.as_ref())?);
        let backend = factory(descriptor)?;

        info!(provider = %kind, "Resolved storage backend");
        Ok(self
            .backends
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(kind)
            .or_insert(backend)
            .clone())
    }

    /// Get list of registered provider names.
    pub fn providers(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.keys().map(|k| k.name()).collect();
        names.sort_unstable();
        names
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        name.parse::<ProviderKind>()
            .map(|kind| self.factories.contains_key(&kind))
            .unwrap_or(false)
    }
}

/// Create a registry with the four cloud backends, building vendor clients
/// through `connector`.
pub fn create_default_registry(
    config: Arc<dyn ConfigSource>,
    connector: Arc<dyn Connector>,
) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new(config);

    let c = connector.clone();
    registry.register(
        ProviderKind::S3,
        Box::new(move |descriptor| {
            let client = c.object_client(&descriptor)?;
            Ok(Arc::new(S3Backend::new(descriptor, client)?))
        }),
    )?;

    let c = connector.clone();
    registry.register(
        ProviderKind::Gcs,
        Box::new(move |descriptor| {
            let client = c.object_client(&descriptor)?;
            Ok(Arc::new(GcsBackend::new(descriptor, client)?))
        }),
    )?;

    let c = connector.clone();
    registry.register(
        ProviderKind::Azure,
        Box::new(move |descriptor| {
            let client = c.object_client(&descriptor)?;
            Ok(Arc::new(AzureBackend::new(descriptor, client)?))
        }),
    )?;

    registry.register(
        ProviderKind::GDrive,
        Box::new(move |descriptor| {
            let api = connector.drive_client(&descriptor)?;
            Ok(Arc::new(GDriveBackend::new(descriptor, api)?))
        }),
    )?;

    Ok(registry)
}
