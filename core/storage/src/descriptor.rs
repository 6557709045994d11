//! Provider kinds, configuration sources and backend descriptors.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use cloudshare_common::{Error, Result, Secret};

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_S3_BUCKET_NAME: &str = "AWS_S3_BUCKET_NAME";
pub const AWS_REGION: &str = "AWS_REGION";
pub const GCS_BUCKET_NAME: &str = "GCS_BUCKET_NAME";
pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const AZURE_STORAGE_CONTAINER_NAME: &str = "AZURE_STORAGE_CONTAINER_NAME";
pub const GOOGLE_DRIVE_CREDENTIALS: &str = "GOOGLE_DRIVE_CREDENTIALS";
pub const GOOGLE_DRIVE_CREDENTIALS_JSON: &str = "GOOGLE_DRIVE_CREDENTIALS_JSON";

const DEFAULT_AWS_REGION: &str = "us-east-1";

/// The supported backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    S3,
    Gcs,
    Azure,
    GDrive,
}

impl ProviderKind {
    /// All kinds, in registration order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::S3,
        ProviderKind::Gcs,
        ProviderKind::Azure,
        ProviderKind::GDrive,
    ];

    /// Provider name used for resolution and in upload results.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::S3 => "aws_s3",
            ProviderKind::Gcs => "google_cloud_storage",
            ProviderKind::Azure => "azure_blob",
            ProviderKind::GDrive => "google_drive",
        }
    }

    /// Required configuration keys.
    ///
    /// Each inner slice is one requirement satisfied by any of its keys.
    pub fn requirements(&self) -> &'static [&'static [&'static str]] {
        match self {
            ProviderKind::S3 => &[
                &[AWS_ACCESS_KEY_ID],
                &[AWS_SECRET_ACCESS_KEY],
                &[AWS_S3_BUCKET_NAME],
            ],
            ProviderKind::Gcs => &[&[GCS_BUCKET_NAME], &[GOOGLE_APPLICATION_CREDENTIALS]],
            ProviderKind::Azure => &[
                &[AZURE_STORAGE_CONNECTION_STRING],
                &[AZURE_STORAGE_CONTAINER_NAME],
            ],
            ProviderKind::GDrive => {
                &[&[GOOGLE_DRIVE_CREDENTIALS, GOOGLE_DRIVE_CREDENTIALS_JSON]]
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::NotFound(format!("Unknown storage provider '{}'", s)))
    }
}

/// Source of named configuration values.
///
/// Empty values are treated as absent.
pub trait ConfigSource: Send + Sync {
    /// Look up a raw value.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Look up a non-empty value.
    fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).filter(|v| !v.trim().is_empty())
    }
}

/// Configuration read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for serde_json::Value {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str()).map(String::from)
    }
}

/// Credential handle of a backend.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// S3 access key pair.
    AccessKey {
        access_key_id: String,
        secret_access_key: Secret,
        region: String,
    },
    /// Path to a service-account key file (GCS).
    KeyFile(PathBuf),
    /// Azure storage connection string.
    ConnectionString(Secret),
    /// Service-account key given as a path, inline JSON, or both (drive).
    ServiceAccount {
        path: Option<PathBuf>,
        inline_json: Option<Secret>,
    },
}

/// Immutable per-provider configuration, resolved once.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    kind: ProviderKind,
    container: Option<String>,
    credentials: Credentials,
}

impl BackendDescriptor {
    /// Resolve the descriptor of `kind` from `config`.
    ///
    /// # Errors
    /// - `Error::Configuration` naming every missing key
    pub fn from_config(kind: ProviderKind, config: &dyn ConfigSource) -> Result<Self> {
        let missing: Vec<String> = kind
            .requirements()
            .iter()
            .filter(|alternatives| alternatives.iter().all(|key| config.get(key).is_none()))
            .map(|alternatives| alternatives.join(" or "))
            .collect();

        if !missing.is_empty() {
            return Err(Error::Configuration(format!(
                "{} requires {}",
                kind,
                missing.join(", ")
            )));
        }

        let require = |key: &str| {
            config
                .get(key)
                .ok_or_else(|| Error::Configuration(format!("{} requires {}", kind, key)))
        };

        let (container, credentials) = match kind {
            ProviderKind::S3 => (
                Some(require(AWS_S3_BUCKET_NAME)?),
                Credentials::AccessKey {
                    access_key_id: require(AWS_ACCESS_KEY_ID)?,
                    secret_access_key: Secret::new(require(AWS_SECRET_ACCESS_KEY)?),
                    region: config
                        .get(AWS_REGION)
                        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                },
            ),
            ProviderKind::Gcs => (
                Some(require(GCS_BUCKET_NAME)?),
                Credentials::KeyFile(PathBuf::from(require(GOOGLE_APPLICATION_CREDENTIALS)?)),
            ),
            ProviderKind::Azure => (
                Some(require(AZURE_STORAGE_CONTAINER_NAME)?),
                Credentials::ConnectionString(Secret::new(require(
                    AZURE_STORAGE_CONNECTION_STRING,
                )?)),
            ),
            ProviderKind::GDrive => (
                None,
                Credentials::ServiceAccount {
                    path: config.get(GOOGLE_DRIVE_CREDENTIALS).map(PathBuf::from),
                    inline_json: config.get(GOOGLE_DRIVE_CREDENTIALS_JSON).map(Secret::new),
                },
            ),
        };

        Ok(Self {
            kind,
            container,
            credentials,
        })
    }

    /// Provider kind.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Bucket or container name (None for the drive backend).
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Credential handle.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.name().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("dropbox".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_s3_descriptor() {
        let cfg = config(&[
            (AWS_ACCESS_KEY_ID, "AKIA"),
            (AWS_SECRET_ACCESS_KEY, "secret"),
            (AWS_S3_BUCKET_NAME, "uploads"),
        ]);
        let descriptor = BackendDescriptor::from_config(ProviderKind::S3, &cfg).unwrap();
        assert_eq!(descriptor.container(), Some("uploads"));
        match descriptor.credentials() {
            Credentials::AccessKey {
                access_key_id,
                region,
                ..
            } => {
                assert_eq!(access_key_id, "AKIA");
                assert_eq!(region, "us-east-1");
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let cfg = config(&[(AWS_ACCESS_KEY_ID, "AKIA"), (AWS_S3_BUCKET_NAME, "uploads")]);
        match BackendDescriptor::from_config(ProviderKind::S3, &cfg) {
            Err(Error::Configuration(msg)) => assert!(msg.contains(AWS_SECRET_ACCESS_KEY)),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let cfg = config(&[
            (AZURE_STORAGE_CONNECTION_STRING, "   "),
            (AZURE_STORAGE_CONTAINER_NAME, "files"),
        ]);
        assert!(BackendDescriptor::from_config(ProviderKind::Azure, &cfg).is_err());
    }

    #[test]
    fn test_drive_accepts_either_credential_key() {
        let inline = config(&[(GOOGLE_DRIVE_CREDENTIALS_JSON, "{}")]);
        assert!(BackendDescriptor::from_config(ProviderKind::GDrive, &inline).is_ok());

        let path = config(&[(GOOGLE_DRIVE_CREDENTIALS, "/etc/drive.json")]);
        let descriptor = BackendDescriptor::from_config(ProviderKind::GDrive, &path).unwrap();
        assert!(descriptor.container().is_none());

        let err = BackendDescriptor::from_config(ProviderKind::GDrive, &config(&[])).unwrap_err();
        assert!(err
            .to_string()
            .contains("GOOGLE_DRIVE_CREDENTIALS or GOOGLE_DRIVE_CREDENTIALS_JSON"));
    }

    #[test]
    fn test_json_value_config_source() {
        let cfg = serde_json::json!({
            "GCS_BUCKET_NAME": "media",
            "GOOGLE_APPLICATION_CREDENTIALS": "/keys/gcs.json",
            "unrelated": 3
        });
        let descriptor = BackendDescriptor::from_config(ProviderKind::Gcs, &cfg).unwrap();
        assert_eq!(descriptor.container(), Some("media"));
        assert!(cfg.get("unrelated").is_some());
        assert!(ConfigSource::get(&cfg, "unrelated").is_none());
    }
}
