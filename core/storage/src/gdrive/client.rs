//! Google Drive v3 REST client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use cloudshare_common::{Error, Result, Secret};

use super::api::{DriveApi, DriveFile, FOLDER_MIME_TYPE};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every file resource.
const FILE_FIELDS: &str =
    "id,name,mimeType,size,modifiedTime,parents,webContentLink,webViewLink,trashed";

/// Source of OAuth2 bearer tokens for the Drive API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// A fixed access token.
pub struct StaticToken(Secret);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.expose().to_string())
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let http = Client::builder()
            .user_agent("cloudshare/0.1")
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, tokens })
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = check_status(response.status());
        match status {
            Ok(()) => response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e))),
            Err(Error::Network(_)) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(Error::Network(format!("API error: {} - {}", status, body)))
            }
            Err(e) => Err(e),
        }
    }

    /// Handle a response whose body is not needed.
    async fn handle_empty(&self, response: reqwest::Response) -> Result<()> {
        match check_status(response.status()) {
            Err(Error::Network(_)) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(Error::Network(format!("API error: {} - {}", status, body)))
            }
            other => other,
        }
    }
}

/// Map an HTTP status onto the common error taxonomy.
fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(Error::NotFound("Resource not found".to_string()))
    } else if status == StatusCode::UNAUTHORIZED {
        Err(Error::Authentication("Invalid or expired token".to_string()))
    } else if status == StatusCode::FORBIDDEN {
        Err(Error::PermissionDenied("Access denied".to_string()))
    } else {
        Err(Error::Network(format!("API error: {}", status)))
    }
}

/// Build a Drive search query for folders named `name` under `parent_id`.
fn folder_query(name: &str, parent_id: Option<&str>) -> String {
    let mut query = format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query(name),
        FOLDER_MIME_TYPE
    );
    if let Some(parent) = parent_id {
        query.push_str(&format!(" and '{}' in parents", escape_query(parent)));
    }
    query
}

/// Build a Drive search query listing entries under `parent_id`.
fn listing_query(parent_id: Option<&str>) -> String {
    match parent_id {
        Some(parent) => format!("trashed = false and '{}' in parents", escape_query(parent)),
        None => "trashed = false".to_string(),
    }
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build the multipart/related body for a metadata + content upload.
fn multipart_body(boundary: &str, metadata_json: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + metadata_json.len() + 256);

    // Metadata part
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(b"\r\n");

    // Data part
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--", boundary).as_bytes());
    body
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<DriveFile>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.auth_header().await?;
        let query = folder_query(name, parent_id);
        let fields = format!("files({})", FILE_FIELDS);

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", fields.as_str()),
                ("pageSize", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to find folder: {}", e)))?;

        let list_response: FileListResponse = self.handle_response(response).await?;
        Ok(list_response.files.into_iter().next())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.auth_header().await?;

        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create folder: {}", e)))?;

        self.handle_response(response).await
    }

    async fn create_file(&self, name: &str, parent_id: Option<&str>, data: Vec<u8>) -> Result<DriveFile> {
        let url = format!("{}/files?uploadType=multipart", DRIVE_UPLOAD_BASE);
        let auth = self.auth_header().await?;

        let mut metadata = serde_json::json!({ "name": name });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }
        let metadata_json = serde_json::to_string(&metadata)?;

        let boundary = "CloudshareBoundary";
        let body = multipart_body(boundary, &metadata_json, &data);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .query(&[("fields", FILE_FIELDS)])
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn share_publicly(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}/permissions", DRIVE_API_BASE, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", "id")])
            .json(&serde_json::json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to share file: {}", e)))?;

        self.handle_empty(response).await
    }

    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .delete(&url)
            .header(header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete file: {}", e)))?;

        self.handle_empty(response).await
    }

    async fn list_files(&self, parent_id: Option<&str>) -> Result<Vec<DriveFile>> {
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;
        let query = listing_query(parent_id);
        let fields = format!("files({}),nextPageToken", FILE_FIELDS);

        loop {
            let url = format!("{}/files", DRIVE_API_BASE);
            let auth = self.auth_header().await?;

            let mut request = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, auth)
                .query(&[
                    ("q", query.as_str()),
                    ("spaces", "drive"),
                    ("fields", fields.as_str()),
                    ("pageSize", "1000"),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Network(format!("Failed to list files: {}", e)))?;

            let list_response: FileListResponse = self.handle_response(response).await?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_query_with_parent() {
        let query = folder_query("Q1 'draft'", Some("parent123"));
        assert_eq!(
            query,
            "name = 'Q1 \\'draft\\'' and mimeType = 'application/vnd.google-apps.folder' \
             and trashed = false and 'parent123' in parents"
        );
    }

    #[test]
    fn test_folder_query_at_root() {
        let query = folder_query("docs", None);
        assert!(!query.contains("in parents"));
    }

    #[test]
    fn test_listing_query() {
        assert_eq!(listing_query(None), "trashed = false");
        assert_eq!(
            listing_query(Some("f1")),
            "trashed = false and 'f1' in parents"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("B", r#"{"name":"a.txt"}"#, b"hello");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--B\r\nContent-Type: application/json"));
        assert!(text.contains("{\"name\":\"a.txt\"}\r\n--B\r\n"));
        assert!(text.contains("application/octet-stream\r\n\r\nhello\r\n"));
        assert!(text.ends_with("--B--"));
    }

    #[test]
    fn test_check_status_mapping() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(matches!(check_status(StatusCode::NOT_FOUND), Err(Error::NotFound(_))));
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY),
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_static_token_source() {
        let client = DriveClient::new(Arc::new(StaticToken::new("ya29.token"))).unwrap();
        assert_eq!(client.auth_header().await.unwrap(), "Bearer ya29.token");
    }
}
