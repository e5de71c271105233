//! End-to-end scenarios for `JobClient` over deterministic fakes.
//!
//! These cover the full upload → poll → results sequence without any
//! network: each collaborator is a scripted in-memory implementation.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use shortcut_client::models::job::{JobId, JobState, StatusSnapshot};
use shortcut_client::models::results::{MediaAsset, ResultsPayload};
use shortcut_client::services::client::{
    ClientError, FetchError, JobClient, ResultsFetcher, UploadError, Uploader,
};
use shortcut_client::services::poll::{PollError, StatusError, StatusSource};
use shortcut_client::services::progress::ProgressSink;

struct FakeUploader {
    job_id: &'static str,
    fail_with: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeUploader {
    fn returning(job_id: &'static str) -> Self {
        Self {
            job_id,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            job_id: "",
            fail_with: Some(message),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn submit(
        &self,
        _file_path: &Path,
        _configuration: Option<&serde_json::Value>,
    ) -> Result<JobId, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(message) => Err(UploadError::new(message)),
            None => Ok(JobId::from(self.job_id)),
        }
    }
}

/// Replays a fixed sequence of status outcomes, panicking on over-fetch.
struct ScriptedStatus {
    script: Mutex<VecDeque<Result<StatusSnapshot, StatusError>>>,
}

impl ScriptedStatus {
    fn new(script: Vec<Result<StatusSnapshot, StatusError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn fetch_status(&self, _job_id: &JobId) -> Result<StatusSnapshot, StatusError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("fetch_status called after the script ended")
    }
}

struct FakeFetcher {
    payload: ResultsPayload,
    calls: AtomicUsize,
    last_job_id: Mutex<Option<JobId>>,
    fail_with: Option<&'static str>,
}

impl FakeFetcher {
    fn returning(payload: ResultsPayload) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
            last_job_id: Mutex::new(None),
            fail_with: None,
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            ..Self::returning(empty_payload())
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultsFetcher for FakeFetcher {
    async fn fetch_results(&self, job_id: &JobId) -> Result<ResultsPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_job_id.lock().unwrap() = Some(job_id.clone());
        match self.fail_with {
            Some(message) => Err(FetchError::new(message)),
            None => Ok(self.payload.clone()),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    seen: Mutex<Vec<StatusSnapshot>>,
}

impl ProgressSink for RecordingSink {
    fn on_update(&self, snapshot: &StatusSnapshot) {
        self.seen.lock().unwrap().push(snapshot.clone());
    }
}

fn empty_payload() -> ResultsPayload {
    ResultsPayload {
        main_video: None,
        shorts: Vec::new(),
        subtitles: None,
    }
}

fn sample_payload() -> ResultsPayload {
    ResultsPayload {
        main_video: Some(MediaAsset {
            url: "a".to_string(),
        }),
        shorts: Vec::new(),
        subtitles: None,
    }
}

fn success_script() -> Vec<Result<StatusSnapshot, StatusError>> {
    vec![
        Ok(StatusSnapshot::pending()),
        Ok(StatusSnapshot::running(40, "Encoding")),
        Ok(StatusSnapshot::completed()),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_success() {
    let uploader = Arc::new(FakeUploader::returning("job-1"));
    let status = Arc::new(ScriptedStatus::new(success_script()));
    let fetcher = Arc::new(FakeFetcher::returning(sample_payload()));
    let sink = Arc::new(RecordingSink::default());

    let client = JobClient::new(uploader.clone(), status, fetcher.clone())
        .with_sink(sink.clone());

    let results = client.run(Path::new("example_video.mp4"), None).await.unwrap();

    assert_eq!(results, sample_payload());
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        *fetcher.last_job_id.lock().unwrap(),
        Some(JobId::from("job-1"))
    );

    let seen = sink.seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].state, JobState::Pending);
    assert_eq!(seen[1].state, JobState::Running);
    assert_eq!(seen[1].percentage, 40);
    assert_eq!(seen[1].stage, "Encoding");
    assert_eq!(seen[2].state, JobState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_failure_skips_results_fetch() {
    let uploader = Arc::new(FakeUploader::returning("job-1"));
    let status = Arc::new(ScriptedStatus::new(vec![Ok(StatusSnapshot::failed(
        "decode error",
    ))]));
    let fetcher = Arc::new(FakeFetcher::returning(sample_payload()));

    let client = JobClient::new(uploader, status, fetcher.clone());
    let err = client
        .run(Path::new("example_video.mp4"), None)
        .await
        .unwrap_err();

    match err {
        ClientError::Poll(PollError::JobFailed { reason }) => {
            assert_eq!(reason, "decode error");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert_eq!(fetcher.calls(), 0, "results must not be fetched for a failed job");
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_aborts_before_polling() {
    let uploader = Arc::new(FakeUploader::failing("server rejected upload"));
    // An empty script panics on any fetch, so success here proves the poll
    // loop never started.
    let status = Arc::new(ScriptedStatus::new(Vec::new()));
    let fetcher = Arc::new(FakeFetcher::returning(sample_payload()));

    let client = JobClient::new(uploader.clone(), status, fetcher.clone());
    let err = client
        .run(Path::new("example_video.mp4"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Upload(_)));
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_results_fetch_failure_surfaces() {
    let uploader = Arc::new(FakeUploader::returning("job-1"));
    let status = Arc::new(ScriptedStatus::new(vec![Ok(StatusSnapshot::completed())]));
    let fetcher = Arc::new(FakeFetcher::failing("results not ready"));

    let client = JobClient::new(uploader, status, fetcher.clone());
    let err = client
        .run(Path::new("example_video.mp4"), None)
        .await
        .unwrap_err();

    match err {
        ClientError::Fetch(e) => assert_eq!(e.message, "results not ready"),
        other => panic!("expected Fetch, got {other:?}"),
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_runs_produce_identical_results() {
    let uploader = Arc::new(FakeUploader::returning("job-1"));
    let mut script = success_script();
    script.extend(success_script());
    let status = Arc::new(ScriptedStatus::new(script));
    let fetcher = Arc::new(FakeFetcher::returning(sample_payload()));

    let client = JobClient::new(uploader, status, fetcher.clone());

    let first = client.run(Path::new("example_video.mp4"), None).await.unwrap();
    let second = client.run(Path::new("example_video.mp4"), None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_noise_is_invisible_to_the_caller() {
    let uploader = Arc::new(FakeUploader::returning("job-1"));
    let status = Arc::new(ScriptedStatus::new(vec![
        Err(StatusError::transient("timeout")),
        Ok(StatusSnapshot::pending()),
        Err(StatusError::transient("connection reset")),
        Ok(StatusSnapshot::completed()),
    ]));
    let fetcher = Arc::new(FakeFetcher::returning(sample_payload()));

    let client = JobClient::new(uploader, status, fetcher);
    let results = client.run(Path::new("example_video.mp4"), None).await.unwrap();

    assert_eq!(results, sample_payload());
}
