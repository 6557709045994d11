//! Temporary file sharing for cloudshare.
//!
//! `TempFileRegistry` hands out opaque handles to stored artifacts. Each
//! handle expires after a fixed window and can be redeemed a limited number
//! of times. State is kept in a single JSON snapshot that is rewritten on
//! every mutation.
//!
//! Access to one store file must go through one registry instance; several
//! processes sharing a store file is unsupported.

pub mod artifact;
pub mod clock;
pub mod record;
pub mod registry;
mod store;

pub use artifact::{ArtifactRemover, BackendArtifacts, LocalArtifacts};
pub use clock::{Clock, ManualClock, SystemClock};
pub use record::{FileRecord, FileSummary, Registration};
pub use registry::{TempFileRegistry, STORE_FILE_NAME};
