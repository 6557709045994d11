//! Common utilities and types shared across the cloudshare crates.
//!
//! This module provides the error type every crate returns, the logical
//! folder path used by hierarchical backends, secret handling, and the
//! contract of the tool-recommendation collaborator.

pub mod error;
pub mod tool;
pub mod types;

pub use error::{Error, Result};
pub use tool::{ToolDescriptor, ToolRecommender};
pub use types::{FolderPath, Secret};
