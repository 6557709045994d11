//! Contract of the tool-recommendation collaborator.
//!
//! The classifier itself lives outside this workspace. It takes a free-text
//! query and answers with exactly one descriptor taken from an externally
//! maintained catalog; ranking is not validated here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A tool chosen by the recommender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Display name of the tool.
    pub name: String,
    /// Relative path of the tool inside the catalog.
    pub path: String,
    /// What the tool does.
    pub description: String,
}

impl ToolDescriptor {
    /// Parse a classifier reply, rejecting descriptors with empty fields.
    pub fn from_json(reply: &str) -> Result<Self> {
        let descriptor: ToolDescriptor = serde_json::from_str(reply.trim())?;
        for (field, value) in [
            ("name", &descriptor.name),
            ("path", &descriptor.path),
            ("description", &descriptor.description),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Tool descriptor has an empty '{}'",
                    field
                )));
            }
        }
        Ok(descriptor)
    }
}

/// Natural-language classifier that maps a query onto one catalog tool.
#[async_trait]
pub trait ToolRecommender: Send + Sync {
    /// Pick the single best tool for `query`.
    async fn recommend(&self, query: &str) -> Result<ToolDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeywordRecommender;

    #[async_trait]
    impl ToolRecommender for KeywordRecommender {
        async fn recommend(&self, query: &str) -> Result<ToolDescriptor> {
            if query.contains("JSON") {
                ToolDescriptor::from_json(
                    r#"{"name":"JSON Validator","path":"python/textValidators/json_validator.py","description":"Validates JSON strings."}"#,
                )
            } else {
                Err(Error::NotFound(format!("No tool matches '{}'", query)))
            }
        }
    }

    #[test]
    fn test_from_json_valid() {
        let tool = ToolDescriptor::from_json(
            "  {\"name\":\"PDF Merge\",\"path\":\"python/pdfs/pdfMerge.py\",\"description\":\"Merges PDFs.\"}\n",
        )
        .unwrap();
        assert_eq!(tool.name, "PDF Merge");
        assert_eq!(tool.path, "python/pdfs/pdfMerge.py");
    }

    #[test]
    fn test_from_json_rejects_empty_field() {
        let result =
            ToolDescriptor::from_json(r#"{"name":"","path":"x.py","description":"d"}"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_rejects_missing_field() {
        let result = ToolDescriptor::from_json(r#"{"name":"Tool"}"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[tokio::test]
    async fn test_recommender_contract() {
        let recommender = KeywordRecommender;
        let tool = recommender.recommend("Validate this JSON file").await.unwrap();
        assert_eq!(tool.name, "JSON Validator");
        assert!(recommender.recommend("make a QR code").await.is_err());
    }
}
