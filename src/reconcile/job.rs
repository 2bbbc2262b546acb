use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of a server-side asynchronous job.
///
/// Only meaningful for the lifetime of a single reconciliation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by a job-status endpoint.
///
/// The remote vocabulary is closed (`IN_PROGRESS`, `COMPLETED`, `FAILED`).
/// Anything else is kept verbatim in [`JobStatus::Unrecognized`] and never
/// coerced into one of the known states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
    Unrecognized(String),
}

impl JobStatus {
    /// `true` for every status that ends the poll loop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "IN_PROGRESS" => JobStatus::InProgress,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::Unrecognized(raw),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        JobStatus::from(raw.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::InProgress => write!(f, "IN_PROGRESS"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// One observation of a job's state. Every poll produces a fresh value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    #[serde(alias = "state")]
    pub status: JobStatus,
    /// Free-text diagnostic, carried through to the caller and never parsed.
    #[serde(default)]
    pub description: String,
}

impl JobState {
    pub fn new(status: impl Into<JobStatus>, description: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            description: description.into(),
        }
    }

    pub fn in_progress(description: impl Into<String>) -> Self {
        Self::new(JobStatus::InProgress, description)
    }

    pub fn completed() -> Self {
        Self::new(JobStatus::Completed, "")
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self::new(JobStatus::Failed, description)
    }
}

/// Structured error detail returned by the remote API alongside a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: Option<String>,
    pub message: String,
}

/// What a submission call returned before any asynchronous processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmediateResult {
    pub status_code: u16,
    pub job: Option<JobHandle>,
    pub error: Option<RemoteError>,
}

impl ImmediateResult {
    /// Accepted for asynchronous processing under the given job.
    pub fn accepted(status_code: u16, job: JobHandle) -> Self {
        Self {
            status_code,
            job: Some(job),
            error: None,
        }
    }

    /// Resolved synchronously, nothing to wait for.
    pub fn completed(status_code: u16) -> Self {
        Self {
            status_code,
            job: None,
            error: None,
        }
    }

    pub fn rejected(status_code: u16, error: Option<RemoteError>) -> Self {
        Self {
            status_code,
            job: None,
            error,
        }
    }
}

/// Classifies why a reconciliation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureKind {
    /// The remote system declined the mutation synchronously.
    #[error("submission rejected with status {status}")]
    Rejected {
        status: u16,
        detail: Option<RemoteError>,
    },
    /// The submission never reached the remote system (network, protocol).
    #[error("transport failure: {0}")]
    Transport(String),
    /// The job itself finished with `FAILED`.
    #[error("job {job} failed: {description}")]
    JobFailed { job: JobHandle, description: String },
    /// The job reported a status outside the known vocabulary.
    #[error("job {job} reported unrecognized status {status:?}")]
    UnrecognizedStatus {
        job: JobHandle,
        status: String,
        description: String,
    },
    /// The job never reached a terminal state within the deadline.
    /// The remote operation may still complete later.
    #[error("job {job} timed out after {polls} polls")]
    TimedOut {
        job: JobHandle,
        polls: u32,
        last_description: Option<String>,
    },
}

impl FailureKind {
    /// `false` when the remote state is unknown rather than known-bad.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, FailureKind::TimedOut { .. })
    }
}

/// The only thing a resource operation sees of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationOutcome {
    Success,
    Failure { kind: FailureKind, message: String },
}

impl ReconciliationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReconciliationOutcome::Success)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ReconciliationOutcome::Failure {
                kind: FailureKind::TimedOut { .. },
                ..
            }
        )
    }

    /// Human-readable diagnostic, `None` on success.
    pub fn message(&self) -> Option<&str> {
        match self {
            ReconciliationOutcome::Success => None,
            ReconciliationOutcome::Failure { message, .. } => Some(message),
        }
    }

    pub fn kind(&self) -> Option<&FailureKind> {
        match self {
            ReconciliationOutcome::Success => None,
            ReconciliationOutcome::Failure { kind, .. } => Some(kind),
        }
    }
}

/// Structured record produced at the end of every reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub operation: String,
    pub job: Option<JobHandle>,
    pub succeeded: bool,
    pub message: Option<String>,
    pub polls: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl ReconcileReport {
    pub fn new(
        operation: String,
        started_at: DateTime<Utc>,
        job: Option<JobHandle>,
        polls: u32,
        outcome: &ReconciliationOutcome,
    ) -> Self {
        let now = Utc::now();
        let duration = now - started_at;

        Self {
            operation,
            job,
            succeeded: outcome.is_success(),
            message: outcome.message().map(str::to_string),
            polls,
            started_at,
            completed_at: now,
            duration_ms: duration.num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_parses_known_values() {
        assert_eq!(JobStatus::from("IN_PROGRESS"), JobStatus::InProgress);
        assert_eq!(JobStatus::from("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::from("FAILED"), JobStatus::Failed);
    }

    #[test]
    fn job_status_keeps_unknown_values_verbatim() {
        assert_eq!(
            JobStatus::from("completed"),
            JobStatus::Unrecognized("completed".into())
        );
        assert_eq!(
            JobStatus::from("PENDING").to_string(),
            "PENDING",
            "unknown statuses must display as received"
        );
    }

    #[test]
    fn only_in_progress_is_non_terminal() {
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Unrecognized("X".into()).is_terminal());
    }

    #[test]
    fn job_state_deserializes_status_or_state_field() {
        let a: JobState =
            serde_json::from_str(r#"{"status":"FAILED","description":"quota exceeded"}"#).unwrap();
        assert_eq!(a, JobState::failed("quota exceeded"));

        let b: JobState = serde_json::from_str(r#"{"state":"IN_PROGRESS"}"#).unwrap();
        assert_eq!(b.status, JobStatus::InProgress);
        assert!(b.description.is_empty());
    }

    #[test]
    fn job_state_serializes_wire_status() {
        let json = serde_json::to_string(&JobState::completed()).unwrap();
        assert!(json.contains(r#""status":"COMPLETED""#));
    }

    #[test]
    fn timeout_is_not_definitive() {
        let kind = FailureKind::TimedOut {
            job: JobHandle::new("J1"),
            polls: 4,
            last_description: None,
        };
        assert!(!kind.is_definitive());
        assert!(
            FailureKind::JobFailed {
                job: JobHandle::new("J1"),
                description: "boom".into()
            }
            .is_definitive()
        );
    }

    #[test]
    fn outcome_accessors() {
        let ok = ReconciliationOutcome::Success;
        assert!(ok.is_success());
        assert_eq!(ok.message(), None);

        let failed = ReconciliationOutcome::Failure {
            kind: FailureKind::Transport("connection refused".into()),
            message: "can't be created".into(),
        };
        assert!(!failed.is_success());
        assert!(!failed.is_timeout());
        assert_eq!(failed.message(), Some("can't be created"));
    }

    #[test]
    fn report_reflects_outcome() {
        let started = Utc::now();
        let outcome = ReconciliationOutcome::Failure {
            kind: FailureKind::Transport("reset".into()),
            message: "BTP Directory Features can't be created; reset".into(),
        };
        let report = ReconcileReport::new(
            "BTP Directory Features created".into(),
            started,
            None,
            0,
            &outcome,
        );

        assert!(!report.succeeded);
        assert_eq!(report.polls, 0);
        assert_eq!(
            report.message.as_deref(),
            Some("BTP Directory Features can't be created; reset")
        );
        assert!(report.completed_at >= report.started_at);
    }
}
