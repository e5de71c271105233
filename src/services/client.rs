//! End-to-end job orchestration: upload, poll, fetch results.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::job::JobId;
use crate::models::results::ResultsPayload;
use crate::services::poll::{PollConfig, PollError, PollLoop, StatusSource};
use crate::services::progress::ProgressSink;

/// Submits a file for processing and returns the job the server assigned.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn submit(
        &self,
        file_path: &Path,
        configuration: Option<&serde_json::Value>,
    ) -> Result<JobId, UploadError>;
}

/// Retrieves the artifacts of a completed job.
#[async_trait]
pub trait ResultsFetcher: Send + Sync {
    async fn fetch_results(&self, job_id: &JobId) -> Result<ResultsPayload, FetchError>;
}

/// Upload rejection, either transport-level or server-side.
#[derive(Debug, thiserror::Error)]
#[error("upload failed: {message}")]
pub struct UploadError {
    pub message: String,
    /// Response body the server sent with the rejection, when there was one.
    pub server_payload: Option<String>,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_payload: None,
        }
    }

    pub fn with_payload(message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_payload: Some(payload.into()),
        }
    }
}

/// Results retrieval failure.
#[derive(Debug, thiserror::Error)]
#[error("failed to get results: {message}")]
pub struct FetchError {
    pub message: String,
    pub server_payload: Option<String>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_payload: None,
        }
    }

    pub fn with_payload(message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_payload: Some(payload.into()),
        }
    }
}

/// The only errors a [`JobClient`] caller ever sees. All transport noise
/// during polling is absorbed by the loop itself.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Sequences upload, polling, and results retrieval for one file.
///
/// The three collaborators are injected separately so each can be faked in
/// isolation; in production all three are the same HTTP client.
pub struct JobClient<U, S, F>
where
    U: Uploader,
    S: StatusSource,
    F: ResultsFetcher,
{
    uploader: Arc<U>,
    status_source: Arc<S>,
    results_fetcher: Arc<F>,
    poll_config: PollConfig,
    sinks: Vec<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl<U, S, F> JobClient<U, S, F>
where
    U: Uploader,
    S: StatusSource,
    F: ResultsFetcher,
{
    pub fn new(uploader: Arc<U>, status_source: Arc<S>, results_fetcher: Arc<F>) -> Self {
        Self {
            uploader,
            status_source,
            results_fetcher,
            poll_config: PollConfig::default(),
            sinks: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Submit the file, poll the resulting job to completion, and return
    /// its artifacts.
    ///
    /// Upload and results-fetch failures abort immediately and are never
    /// retried here; a failed or timed-out poll skips the results fetch
    /// entirely.
    pub async fn run(
        &self,
        file_path: &Path,
        configuration: Option<&serde_json::Value>,
    ) -> Result<ResultsPayload, ClientError> {
        let job_id = self.uploader.submit(file_path, configuration).await?;
        tracing::info!(job_id = %job_id, file = %file_path.display(), "Upload accepted, tracking job");

        let mut poll = PollLoop::new(
            self.status_source.as_ref(),
            job_id.clone(),
            self.poll_config.clone(),
        )
        .with_cancellation(self.cancel.clone());
        for sink in &self.sinks {
            poll = poll.with_sink(sink.clone());
        }
        let final_snapshot = poll.run().await?;

        tracing::info!(
            job_id = %job_id,
            stage = %final_snapshot.stage,
            "Fetching results"
        );
        let results = self.results_fetcher.fetch_results(&job_id).await?;
        Ok(results)
    }
}
