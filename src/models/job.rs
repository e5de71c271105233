use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stage label reported when the server omits one.
pub const DEFAULT_STAGE: &str = "Processing";

/// Error message reported when a failed job carries none.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Opaque project/job identifier assigned by the server at upload time.
///
/// The server owns the format; the client only carries it back on status
/// and results requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a server-side processing job.
///
/// `Completed` and `Failed` are terminal. Status strings the server may
/// introduce later land in `Other` and are treated as still in flight; the
/// server reports the running phase as `Processing`, which parses to
/// `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum JobState {
    #[default]
    Pending,
    #[strum(to_string = "Running", serialize = "Processing")]
    Running,
    Completed,
    Failed,
    #[strum(default)]
    Other(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Raw status document returned by `GET /api/v1/projects/{id}/status`.
///
/// Everything except `status` is best-effort display data.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusDocument {
    pub status: String,
    #[serde(default)]
    pub progress: Option<ProgressDocument>,
    #[serde(default)]
    pub error: Option<ErrorDocument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressDocument {
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDocument {
    #[serde(default)]
    pub message: Option<String>,
}

/// One point-in-time view of a job, rebuilt on every poll.
///
/// Snapshots are never merged; each one fully replaces the previous for
/// display purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: JobState,
    pub percentage: u8,
    pub stage: String,
    pub error_message: Option<String>,
}

impl StatusSnapshot {
    /// Build a snapshot from the wire document, filling display defaults
    /// for whatever the server left out.
    pub fn from_document(doc: StatusDocument) -> Self {
        // Parsing cannot fail: unknown status strings land in Other.
        let state: JobState = doc.status.parse().unwrap_or_default();
        let progress = doc.progress.unwrap_or_default();
        let percentage = progress.percentage.unwrap_or(0.0).clamp(0.0, 100.0) as u8;
        let stage = progress
            .stage
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string());

        Self {
            state,
            percentage,
            stage,
            error_message: doc.error.and_then(|e| e.message),
        }
    }

    /// The failure reason to surface for a `Failed` snapshot.
    pub fn failure_reason(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }

    pub fn pending() -> Self {
        Self::with_state(JobState::Pending)
    }

    pub fn running(percentage: u8, stage: impl Into<String>) -> Self {
        Self {
            state: JobState::Running,
            percentage,
            stage: stage.into(),
            error_message: None,
        }
    }

    pub fn completed() -> Self {
        Self::with_state(JobState::Completed)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::with_state(JobState::Failed)
        }
    }

    fn with_state(state: JobState) -> Self {
        Self {
            state,
            percentage: 0,
            stage: DEFAULT_STAGE.to_string(),
            error_message: None,
        }
    }
}
