//! Drive API HTTP client
//!
//! Thin typed wrapper over `reqwest`: authentication header, endpoint
//! construction, response deserialization, and the mapping from HTTP
//! status classes to the typed [`ProviderError`] taxonomy that drives
//! retry decisions upstream.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use drivesink_core::config::DriveConfig;
use drivesink_core::ports::ProviderError;

// ============================================================================
// Drive API response types
// ============================================================================

/// One page of a files listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    /// Token for the next page (absent on the last page)
    pub next_page_token: Option<String>,
    /// Files and folders on this page
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Raw file metadata as the Drive API reports it
///
/// This is a wire-level DTO; [`crate::provider::DriveTreeProvider`]
/// normalizes it into `SnapshotEntry` before anything else sees it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Stable file identifier
    pub id: String,
    /// Display name (single path segment)
    pub name: String,
    /// MIME type; folders report `application/vnd.google-apps.folder`
    pub mime_type: Option<String>,
    /// RFC 3339 modification timestamp
    pub modified_time: Option<String>,
    /// Size in bytes - the API serializes this as a string
    pub size: Option<String>,
    /// Content checksum, absent for native workspace documents
    pub md5_checksum: Option<String>,
}

/// MIME type that marks an entry as a folder
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

impl DriveFile {
    /// Returns true if this entry is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Size in bytes, tolerating the API's string encoding
    pub fn size_bytes(&self) -> u64 {
        self.size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

// ============================================================================
// DriveClient
// ============================================================================

/// Authenticated HTTP client for the Drive API
///
/// Every request first waits on the client-side rate limiter, sized from
/// `drive.requests_per_minute`, so steady-state polling stays under the
/// provider's quota instead of bouncing off 429 responses.
pub struct DriveClient {
    http: Client,
    base_url: String,
    access_token: String,
    limiter: DefaultDirectRateLimiter,
}

impl DriveClient {
    /// Creates a client from the operator configuration
    pub fn new(config: &DriveConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            http: Client::new(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        }
    }

    /// Lists one page of the direct children of `folder_id`
    pub async fn list_children(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FileListResponse, ProviderError> {
        self.limiter.until_ready().await;

        let query = format!("'{}' in parents and trashed = false", folder_id);
        let mut request = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query.as_str()),
                (
                    "fields",
                    "nextPageToken, files(id, name, mimeType, modifiedTime, size, md5Checksum)",
                ),
                ("pageSize", "1000"),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(request_error)?;
        let response = check_status(response, folder_id).await?;

        debug!(folder_id, "Listed folder page");
        response
            .json::<FileListResponse>()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Malformed listing response: {e}")))
    }

    /// Downloads the content of a single file
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, ProviderError> {
        self.limiter.until_ready().await;

        let response = self
            .http
            .get(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(request_error)?;
        let response = check_status(response, file_id).await?;

        let bytes = response.bytes().await.map_err(request_error)?;
        debug!(file_id, size = bytes.len(), "Downloaded file content");
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn request_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Unavailable(err.to_string())
}

/// Maps non-success HTTP statuses onto the provider error taxonomy.
///
/// 401/403 and 404 are permanent; 429 and 5xx are transient.
async fn check_status(response: Response, subject: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let detail = body.chars().take(200).collect::<String>();

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Auth(format!("{status}: {detail}"))
        }
        StatusCode::NOT_FOUND => ProviderError::NotFound(subject.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        s if s.is_server_error() => ProviderError::Unavailable(format!("{status}: {detail}")),
        _ => ProviderError::Unavailable(format!("Unexpected status {status}: {detail}")),
    })
}
