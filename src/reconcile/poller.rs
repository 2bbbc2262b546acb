//! Job status polling with a bounded deadline.
//!
//! [`poll_until_terminal`] queries a [`JobStatusSource`] until the job reports
//! `COMPLETED` or `FAILED`, the remote answers with a status it does not know,
//! or the deadline runs out. Transport errors on individual polls are retried;
//! job-reported failures are not.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use super::job::{JobHandle, JobState, JobStatus};

/// Overall wait budget for entitlement and subscription jobs.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Smallest pause between two polls of the same job, in milliseconds.
pub const MIN_POLL_DELAY_MS: u64 = 10;

/// Remote capability that reports the current state of a job.
#[allow(async_fn_in_trait)]
pub trait JobStatusSource {
    type Error: fmt::Display;

    async fn job_status(&self, job: &JobHandle) -> Result<JobState, Self::Error>;
}

/// Backoff between polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay after the first poll, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl PollConfig {
    /// delay = max(min(base_delay_ms * 2^(attempt - 1), max_delay_ms), MIN_POLL_DELAY_MS)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
            .max(MIN_POLL_DELAY_MS)
    }
}

/// A job that reached `COMPLETED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub state: JobState,
    pub polls: u32,
}

/// Every way polling can end without the job completing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("job {job} failed: {description}")]
    JobFailed {
        job: JobHandle,
        description: String,
        polls: u32,
    },

    #[error("job {job} reported unrecognized status {status:?}: {description}")]
    UnrecognizedStatus {
        job: JobHandle,
        status: String,
        description: String,
        polls: u32,
    },

    /// We don't know whether the job finished.
    #[error("job {job} did not reach a terminal state after {polls} polls")]
    DeadlineExceeded {
        job: JobHandle,
        polls: u32,
        last_description: Option<String>,
        last_error: Option<String>,
    },
}

impl PollError {
    pub fn polls(&self) -> u32 {
        match self {
            PollError::JobFailed { polls, .. }
            | PollError::UnrecognizedStatus { polls, .. }
            | PollError::DeadlineExceeded { polls, .. } => *polls,
        }
    }
}

/// Polls `job` until it reaches a terminal state or `deadline` elapses.
///
/// Polls are strictly sequential. Each call is bounded by the time left
/// before the deadline, and the sleep between calls never extends past it.
/// A zero deadline returns `DeadlineExceeded` without polling.
pub async fn poll_until_terminal<S>(
    source: &S,
    job: &JobHandle,
    deadline: Duration,
    config: &PollConfig,
) -> Result<CompletedJob, PollError>
where
    S: JobStatusSource + ?Sized,
{
    let started = Instant::now();
    let mut polls = 0u32;
    let mut last_description: Option<String> = None;
    let mut last_error: Option<String> = None;

    loop {
        let remaining = deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            warn!(job_id = %job, polls, "Job did not finish before the deadline");
            return Err(PollError::DeadlineExceeded {
                job: job.clone(),
                polls,
                last_description,
                last_error,
            });
        }

        polls += 1;
        match timeout(remaining, source.job_status(job)).await {
            Err(_) => {
                warn!(
                    job_id = %job,
                    attempt = polls,
                    "Job status request ran into the deadline"
                );
                last_error = Some("job status request did not answer before the deadline".into());
            }
            Ok(Err(e)) => {
                warn!(
                    job_id = %job,
                    attempt = polls,
                    error = %e,
                    "Job status request failed, retrying"
                );
                last_error = Some(e.to_string());
            }
            Ok(Ok(JobState {
                status,
                description,
            })) => match status {
                JobStatus::Completed => {
                    info!(job_id = %job, polls, "Job completed");
                    return Ok(CompletedJob {
                        state: JobState {
                            status: JobStatus::Completed,
                            description,
                        },
                        polls,
                    });
                }
                JobStatus::Failed => {
                    warn!(job_id = %job, polls, description = %description, "Job failed");
                    return Err(PollError::JobFailed {
                        job: job.clone(),
                        description,
                        polls,
                    });
                }
                JobStatus::Unrecognized(raw) => {
                    warn!(
                        job_id = %job,
                        polls,
                        status = %raw,
                        "Job reported an unrecognized status"
                    );
                    return Err(PollError::UnrecognizedStatus {
                        job: job.clone(),
                        status: raw,
                        description,
                        polls,
                    });
                }
                JobStatus::InProgress => {
                    debug!(
                        job_id = %job,
                        attempt = polls,
                        description = %description,
                        "Job in progress"
                    );
                    last_description = Some(description);
                    last_error = None;
                }
            },
        }

        let remaining = deadline.saturating_sub(started.elapsed());
        let delay = Duration::from_millis(config.delay_for_attempt(polls)).min(remaining);
        debug!(
            job_id = %job,
            attempt = polls,
            delay_ms = delay.as_millis() as u64,
            "Waiting before next poll"
        );
        sleep(delay).await;
    }
}
