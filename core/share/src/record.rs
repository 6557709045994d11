//! Temporary file records.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A registered temporary file, as persisted in the store.
///
/// Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Opaque handle.
    pub id: String,
    /// Location of the artifact (filesystem path or backend key).
    #[serde(rename = "path")]
    pub stored_path: String,
    /// Display name supplied at registration.
    pub original_name: String,
    #[serde(rename = "created")]
    pub created_at: f64,
    #[serde(rename = "expires")]
    pub expires_at: f64,
    /// Maximum number of redemptions; `<= 0` means unlimited.
    pub access_limit: i64,
    /// Redemptions so far.
    pub access_count: u64,
}

impl FileRecord {
    /// Whether the record is past its expiry at `now`.
    ///
    /// A record is still live at exactly `expires_at`.
    pub fn is_expired(&self, now: f64) -> bool {
        now > self.expires_at
    }

    /// Whether every allowed redemption has been used.
    pub fn is_exhausted(&self) -> bool {
        u64::try_from(self.access_limit).is_ok_and(|limit| limit > 0 && self.access_count >= limit)
    }

    /// MIME type to serve the file with.
    ///
    /// The display name's extension wins; when it has no known extension the
    /// stored path's extension is used instead.
    pub fn content_type(&self) -> &'static str {
        mime_for(&self.original_name)
            .or_else(|| mime_for(&self.stored_path))
            .unwrap_or("application/octet-stream")
    }

    /// Listing view of the record at `now`.
    pub fn summary(&self, now: f64) -> FileSummary {
        FileSummary {
            id: self.id.clone(),
            original_name: self.original_name.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            minutes_until_expiry: ((self.expires_at - now) / 60.0).trunc() as i64,
            access_limit: self.access_limit,
            access_count: self.access_count,
        }
    }
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub handle: String,
    pub expires_at: f64,
    pub access_limit: i64,
}

/// A record as shown by listings. Omits the stored path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub id: String,
    pub original_name: String,
    pub created_at: f64,
    pub expires_at: f64,
    /// Whole minutes left, truncated toward zero.
    pub minutes_until_expiry: i64,
    pub access_limit: i64,
    pub access_count: u64,
}

fn mime_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)?;

    match ext.as_str() {
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "mp4" => Some("video/mp4"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, access_limit: i64, access_count: u64) -> FileRecord {
        FileRecord {
            id: "id".to_string(),
            stored_path: "/tmp/x".to_string(),
            original_name: name.to_string(),
            created_at: 0.0,
            expires_at: 600.0,
            access_limit,
            access_count,
        }
    }

    #[test]
    fn test_persisted_field_names() {
        let value = serde_json::to_value(record("a.pdf", 3, 1)).unwrap();
        for key in [
            "id",
            "path",
            "original_name",
            "created",
            "expires",
            "access_limit",
            "access_count",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_reads_integer_timestamps() {
        let json = r#"{"id":"x","path":"/p","original_name":"n","created":10,"expires":70,"access_limit":-1,"access_count":0}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.expires_at, 70.0);
        assert!(!record.is_exhausted());
    }

    #[test]
    fn test_exhaustion() {
        assert!(!record("a", 0, 100).is_exhausted());
        assert!(!record("a", -1, 100).is_exhausted());
        assert!(!record("a", 2, 1).is_exhausted());
        assert!(record("a", 2, 2).is_exhausted());
    }

    #[test]
    fn test_expiry_boundary() {
        let r = record("a", 0, 0);
        assert!(!r.is_expired(600.0));
        assert!(r.is_expired(600.001));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(record("Report.PDF", 0, 0).content_type(), "application/pdf");
        assert_eq!(record("photo.jpeg", 0, 0).content_type(), "image/jpeg");
        assert_eq!(record("archive.tar.gz", 0, 0).content_type(), "application/octet-stream");
        assert_eq!(record("README", 0, 0).content_type(), "application/octet-stream");
    }

    #[test]
    fn test_content_type_falls_back_to_stored_path() {
        let mut r = record("README", 0, 0);
        r.stored_path = "/srv/uploads/readme.txt".to_string();
        assert_eq!(r.content_type(), "text/plain");

        r.original_name = "scan.png".to_string();
        assert_eq!(r.content_type(), "image/png");
    }

    #[test]
    fn test_summary_truncates_minutes() {
        let r = record("a", 0, 0);
        assert_eq!(r.summary(0.0).minutes_until_expiry, 10);
        assert_eq!(r.summary(61.0).minutes_until_expiry, 8);
        let summary = serde_json::to_value(r.summary(0.0)).unwrap();
        assert!(summary.get("path").is_none());
        assert!(summary.get("stored_path").is_none());
    }
}
