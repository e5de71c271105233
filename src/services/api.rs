//! HTTP client for the Shortcut API.
//!
//! Implements all three collaborator traits over one `reqwest` client.
//! Retry policy lives in the poll loop, not here: every method performs
//! exactly one round trip.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::models::job::{JobId, StatusDocument, StatusSnapshot};
use crate::models::results::ResultsPayload;
use crate::services::client::{FetchError, ResultsFetcher, UploadError, Uploader};
use crate::services::poll::{StatusError, StatusSource};

const API_KEY_HEADER: &str = "X-API-Key";

/// Timeout for status and results requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the upload request, which carries the whole video body.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Every API response wraps its payload in a `data` field.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    project_id: String,
}

/// Client for the Shortcut video-processing API.
pub struct ShortcutApi {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ShortcutApi {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Uploader for ShortcutApi {
    async fn submit(
        &self,
        file_path: &Path,
        configuration: Option<&serde_json::Value>,
    ) -> Result<JobId, UploadError> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| UploadError::new(format!("failed to read {}: {e}", file_path.display())))?;

        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4")
            .to_string();

        tracing::info!(
            file = %file_path.display(),
            size_bytes = bytes.len(),
            "Uploading file"
        );

        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(filename));
        if let Some(config) = configuration {
            form = form.text("configuration", config.to_string());
        }

        let response = self
            .http
            .post(self.url("/api/v1/projects/upload"))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| UploadError::new(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let payload = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UploadError::with_payload(
                format!("server rejected upload with status {status}"),
                payload,
            ));
        }

        let body: Envelope<UploadData> = response
            .json()
            .await
            .map_err(|e| UploadError::new(format!("unparsable upload response: {e}")))?;

        Ok(JobId::new(body.data.project_id))
    }
}

#[async_trait]
impl StatusSource for ShortcutApi {
    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusSnapshot, StatusError> {
        let response = self
            .http
            .get(self.url(&format!("/api/v1/projects/{job_id}/status")))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(StatusError::transient)?
            .error_for_status()
            .map_err(StatusError::transient)?;

        let body: Envelope<StatusDocument> = response.json().await.map_err(|e| {
            // A body that arrived but does not decode is a protocol fault;
            // a failure while reading it is still transport trouble.
            if e.is_decode() {
                StatusError::protocol(e)
            } else {
                StatusError::transient(e)
            }
        })?;

        Ok(StatusSnapshot::from_document(body.data))
    }
}

#[async_trait]
impl ResultsFetcher for ShortcutApi {
    async fn fetch_results(&self, job_id: &JobId) -> Result<ResultsPayload, FetchError> {
        let response = self
            .http
            .get(self.url(&format!("/api/v1/projects/{job_id}/results")))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| FetchError::new(format!("results request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let payload = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::with_payload(
                format!("server returned status {status}"),
                payload,
            ));
        }

        let body: Envelope<ResultsPayload> = response
            .json()
            .await
            .map_err(|e| FetchError::new(format!("unparsable results response: {e}")))?;

        Ok(body.data)
    }
}
