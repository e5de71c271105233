//! Job status polling.
//!
//! The poll loop owns all retry and termination policy: transport failures
//! are retried for as long as it takes, unparsable responses are retried
//! against a small consecutive-failure budget, and only a terminal job
//! state, cancellation, or an elapsed deadline ends the loop. The status
//! endpoint itself is behind [`StatusSource`], which performs exactly one
//! round trip per call and carries no retry logic of its own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::job::{JobId, JobState, StatusSnapshot};
use crate::services::progress::ProgressSink;

/// Delay between consecutive status requests, per the service's rate limits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive unparsable responses tolerated before giving up.
pub const DEFAULT_PROTOCOL_FAILURE_BUDGET: u32 = 5;

/// One status round trip for a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusSnapshot, StatusError>;
}

/// Failure of a single status query, as opposed to failure of the job.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The transport failed: timeout, connection reset, non-2xx response.
    #[error("status request failed: {message}")]
    Transient { message: String },

    /// The response arrived but could not be parsed into a status document.
    #[error("unparsable status response: {message}")]
    Protocol { message: String },
}

impl StatusError {
    pub fn transient(source: impl std::fmt::Display) -> Self {
        Self::Transient {
            message: source.to_string(),
        }
    }

    pub fn protocol(source: impl std::fmt::Display) -> Self {
        Self::Protocol {
            message: source.to_string(),
        }
    }
}

/// Terminal outcome of a poll loop that did not end in `Completed`.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The server reported the job itself as failed.
    #[error("processing failed: {reason}")]
    JobFailed { reason: String },

    /// The caller cancelled the operation.
    #[error("polling cancelled")]
    Cancelled,

    /// The configured maximum polling duration elapsed.
    #[error("job did not reach a terminal state within {}s", .elapsed.as_secs())]
    TimedOut { elapsed: Duration },

    /// Too many consecutive responses could not be parsed.
    #[error("gave up after {failures} consecutive unparsable status responses")]
    ProtocolBudgetExhausted { failures: u32 },
}

/// Tuning knobs for [`PollLoop`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed delay between polls, applied after success and failure alike.
    pub poll_interval: Duration,
    /// Optional wall-clock bound on the whole loop. `None` polls forever.
    pub max_duration: Option<Duration>,
    /// Consecutive protocol failures tolerated before aborting.
    pub protocol_failure_budget: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_duration: None,
            protocol_failure_budget: DEFAULT_PROTOCOL_FAILURE_BUDGET,
        }
    }
}

/// Drives one job from submission to a terminal state.
///
/// One instance serves exactly one [`JobId`] with one outstanding status
/// request at a time. Independent jobs run independent loops and share
/// nothing.
pub struct PollLoop<'a, S: StatusSource + ?Sized> {
    source: &'a S,
    job_id: JobId,
    config: PollConfig,
    sinks: Vec<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl<'a, S: StatusSource + ?Sized> PollLoop<'a, S> {
    pub fn new(source: &'a S, job_id: JobId, config: PollConfig) -> Self {
        Self {
            source,
            job_id,
            config,
            sinks: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Register an observer for status snapshots. May be called repeatedly;
    /// every sink sees every snapshot in poll order.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Use an externally owned cancellation token instead of the internal one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Poll until the job reaches a terminal state.
    ///
    /// Returns the final snapshot on `Completed`. Cancellation is observed
    /// at both suspension points: the in-flight fetch and the inter-poll
    /// sleep. The deadline is checked before each fetch, so a terminal
    /// result already obtained is never discarded.
    pub async fn run(self) -> Result<StatusSnapshot, PollError> {
        let started = Instant::now();
        let mut protocol_failures: u32 = 0;

        loop {
            if let Some(max) = self.config.max_duration {
                let elapsed = started.elapsed();
                if elapsed >= max {
                    tracing::warn!(job_id = %self.job_id, elapsed_secs = elapsed.as_secs(), "Polling deadline elapsed");
                    return Err(PollError::TimedOut { elapsed });
                }
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => return Err(PollError::Cancelled),
                result = self.source.fetch_status(&self.job_id) => result,
            };

            match fetched {
                Ok(snapshot) => {
                    protocol_failures = 0;

                    for sink in &self.sinks {
                        sink.on_update(&snapshot);
                    }

                    match &snapshot.state {
                        JobState::Completed => {
                            tracing::info!(job_id = %self.job_id, "Processing completed");
                            return Ok(snapshot);
                        }
                        JobState::Failed => {
                            let reason = snapshot.failure_reason();
                            tracing::warn!(job_id = %self.job_id, error = %reason, "Processing failed");
                            return Err(PollError::JobFailed { reason });
                        }
                        JobState::Other(state) => {
                            tracing::warn!(
                                job_id = %self.job_id,
                                state = %state,
                                "Unrecognized job state, treating as still running"
                            );
                        }
                        JobState::Pending | JobState::Running => {
                            tracing::debug!(
                                job_id = %self.job_id,
                                state = %snapshot.state,
                                percentage = snapshot.percentage,
                                stage = %snapshot.stage,
                                "Job still running"
                            );
                        }
                    }
                }
                Err(StatusError::Transient { message }) => {
                    // Transport noise says nothing about the job; retry
                    // without counting it toward any budget.
                    tracing::debug!(job_id = %self.job_id, error = %message, "Transient status error, will retry");
                }
                Err(StatusError::Protocol { message }) => {
                    protocol_failures += 1;
                    tracing::warn!(
                        job_id = %self.job_id,
                        error = %message,
                        consecutive_failures = protocol_failures,
                        "Unparsable status response"
                    );
                    if protocol_failures >= self.config.protocol_failure_budget {
                        return Err(PollError::ProtocolBudgetExhausted {
                            failures: protocol_failures,
                        });
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}
