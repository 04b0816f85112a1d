//! Dataset API HTTP client implementing the ingestion sink port
//!
//! Endpoints:
//! - `POST {base}/datasets/{dataset}/document/create-by-file` - multipart
//!   upload: a `data` JSON part with the document name and source
//!   metadata, plus the `file` part itself
//! - `DELETE {base}/datasets/{dataset}/documents/{id}`
//!
//! Status mapping: 429 → `RateLimited`, 5xx/network → `Unavailable`
//! (both transient); 401/403 → `Auth`, other 4xx → `Rejected` (both
//! permanent); 404 on delete → `NotFound`.

use reqwest::{multipart, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use drivesink_core::config::IngestConfig;
use drivesink_core::ports::{IIngestionSink, SinkError, SubmitReceipt, SubmitRequest};

// ============================================================================
// API response types
// ============================================================================

/// Upload response; depending on the API version the document object is
/// nested or top-level, so both shapes are accepted.
#[derive(Debug, Deserialize)]
struct CreateDocumentResponse {
    document: Option<DocumentBody>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentBody {
    id: Option<String>,
}

impl CreateDocumentResponse {
    fn document_id(self) -> Option<String> {
        self.document.and_then(|d| d.id).or(self.id)
    }
}

// ============================================================================
// IngestClient
// ============================================================================

/// HTTP client for the dataset ingestion API
pub struct IngestClient {
    http: Client,
    base_url: String,
    api_key: String,
    dataset_id: String,
}

impl IngestClient {
    /// Creates a client from the operator configuration
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            dataset_id: config.dataset_id.clone(),
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/datasets/{}/document/create-by-file",
            self.base_url, self.dataset_id
        )
    }
}

#[async_trait::async_trait]
impl IIngestionSink for IngestClient {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitReceipt, SinkError> {
        let file_name = request.path.file_name().to_string();

        // Source identifiers travel as document metadata so downstream
        // search results can be traced back to the remote file.
        let data = serde_json::json!({
            "name": file_name,
            "metadata": {
                "remote_id": request.remote_id.as_str(),
                "path": request.path.as_str(),
                "fingerprint": request.fingerprint.as_str(),
                "size_bytes": request.size_bytes,
            }
        });

        let form = multipart::Form::new()
            .text("data", data.to_string())
            .part(
                "file",
                multipart::Part::bytes(request.bytes.to_vec()).file_name(file_name.clone()),
            );

        let response = self
            .http
            .post(self.documents_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;
        let response = check_status(response).await?;

        let receipt: CreateDocumentResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Unavailable(format!("Malformed upload response: {e}")))?;
        let document_id = receipt.document_id();

        info!(
            path = %request.path,
            document_id = document_id.as_deref().unwrap_or("<none>"),
            "Document submitted"
        );
        Ok(SubmitReceipt { document_id })
    }

    async fn remove(&self, document_id: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .delete(format!(
                "{}/datasets/{}/documents/{}",
                self.base_url, self.dataset_id, document_id
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SinkError::NotFound);
        }
        check_status(response).await?;

        debug!(document_id, "Document removed");
        Ok(())
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn request_error(err: reqwest::Error) -> SinkError {
    SinkError::Unavailable(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = body.chars().take(200).collect::<String>();

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => SinkError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SinkError::Auth(format!("{status}: {detail}"))
        }
        s if s.is_server_error() => SinkError::Unavailable(format!("{status}: {detail}")),
        _ => SinkError::Rejected(format!("{status}: {detail}")),
    })
}
