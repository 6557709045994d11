//! Common error types for cloudshare.

use thiserror::Error;

/// Top-level error type for cloudshare operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A storage backend could not be resolved.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Network request failed.
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials were rejected.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Operation not permitted by the backend.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Vendor backend call failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A shareable link could not be produced.
    #[error("link generation failed: {0}")]
    LinkGeneration(String),

    /// Persisted state could not be read back.
    #[error("Corrupt store: {0}")]
    Corruption(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
