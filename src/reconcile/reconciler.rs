//! Submit-then-reconcile for a single logical mutation.
//!
//! [`Reconciler`] submits a request, interprets the immediate response and,
//! when the remote accepted the work asynchronously, waits for the job through
//! [`poll_until_terminal`]. Every path ends in one [`ReconciliationOutcome`];
//! no transport error escapes. The submission itself is never retried.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::job::{
    FailureKind, ImmediateResult, JobHandle, ReconcileReport, ReconciliationOutcome, RemoteError,
};
use super::poller::{JobStatusSource, PollConfig, PollError, poll_until_terminal};

/// Remote capability that submits one kind of mutation request.
#[allow(async_fn_in_trait)]
pub trait MutationSubmitter<R> {
    type Error: fmt::Display;

    async fn submit(&self, request: &R) -> Result<ImmediateResult, Self::Error>;
}

/// The single status code an endpoint uses to say "accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance(u16);

impl Acceptance {
    /// `202 Accepted`: entitlement and subscription endpoints.
    pub const ACCEPTED: Acceptance = Acceptance(202);
    /// `200 OK`: directory features and directory entitlements.
    pub const OK: Acceptance = Acceptance(200);
    /// `201 Created`: sub-account creation.
    pub const CREATED: Acceptance = Acceptance(201);

    pub const fn status(code: u16) -> Self {
        Self(code)
    }

    pub fn code(self) -> u16 {
        self.0
    }
}

/// The resource operation a mutation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn past_tense(self) -> &'static str {
        match self {
            Operation::Create => "created",
            Operation::Update => "updated",
            Operation::Delete => "deleted",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Names a mutation in diagnostics, e.g. "BTP Sub Account Entitlements" + update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationLabel {
    pub subject: String,
    pub operation: Operation,
}

impl MutationLabel {
    pub fn new(subject: impl Into<String>, operation: Operation) -> Self {
        Self {
            subject: subject.into(),
            operation,
        }
    }

    fn cannot_be(&self) -> String {
        format!(
            "{} can't be {}",
            self.subject,
            self.operation.past_tense()
        )
    }
}

impl fmt::Display for MutationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.subject)
    }
}

/// Drives one submit-then-poll cycle per call.
///
/// Holds no state between calls; concurrent reconciliations need only
/// separate requests.
pub struct Reconciler<'a, C> {
    client: &'a C,
    acceptance: Acceptance,
    poll: PollConfig,
}

impl<'a, C> Reconciler<'a, C> {
    pub fn new(client: &'a C, acceptance: Acceptance) -> Self {
        Self {
            client,
            acceptance,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Submits `request` and waits up to `deadline` for the remote job.
    pub async fn reconcile<R>(
        &self,
        label: &MutationLabel,
        request: &R,
        deadline: Duration,
    ) -> ReconciliationOutcome
    where
        C: MutationSubmitter<R> + JobStatusSource,
    {
        self.reconcile_with_report(label, request, deadline).await.0
    }

    /// Same as [`Reconciler::reconcile`], also returning a structured report.
    pub async fn reconcile_with_report<R>(
        &self,
        label: &MutationLabel,
        request: &R,
        deadline: Duration,
    ) -> (ReconciliationOutcome, ReconcileReport)
    where
        C: MutationSubmitter<R> + JobStatusSource,
    {
        let started_at = Utc::now();
        let (outcome, job, polls) = self.drive(label, request, deadline).await;
        let report = ReconcileReport::new(label.to_string(), started_at, job, polls, &outcome);
        (outcome, report)
    }

    async fn drive<R>(
        &self,
        label: &MutationLabel,
        request: &R,
        deadline: Duration,
    ) -> (ReconciliationOutcome, Option<JobHandle>, u32)
    where
        C: MutationSubmitter<R> + JobStatusSource,
    {
        info!(operation = %label, "Submitting mutation");

        let immediate = match self.client.submit(request).await {
            Ok(immediate) => immediate,
            Err(e) => {
                warn!(operation = %label, error = %e, "Submission failed");
                let message = format!("{}; {e}", label.cannot_be());
                let outcome = ReconciliationOutcome::Failure {
                    kind: FailureKind::Transport(e.to_string()),
                    message,
                };
                return (outcome, None, 0);
            }
        };

        let ImmediateResult {
            status_code,
            job,
            error,
        } = immediate;

        if error.is_some() || status_code != self.acceptance.code() {
            warn!(
                operation = %label,
                status = status_code,
                expected = self.acceptance.code(),
                "Submission rejected"
            );
            return (rejected(label, status_code, error), None, 0);
        }

        let Some(job) = job else {
            info!(operation = %label, status = status_code, "Mutation applied synchronously");
            return (ReconciliationOutcome::Success, None, 0);
        };

        info!(operation = %label, job_id = %job, "Mutation accepted, waiting for job");
        match poll_until_terminal(self.client, &job, deadline, &self.poll).await {
            Ok(done) => (ReconciliationOutcome::Success, Some(job), done.polls),
            Err(e) => {
                let polls = e.polls();
                (from_poll_error(label, e, deadline), Some(job), polls)
            }
        }
    }
}

fn rejected(
    label: &MutationLabel,
    status: u16,
    detail: Option<RemoteError>,
) -> ReconciliationOutcome {
    let message = match &detail {
        Some(detail) => format!(
            "{}; Operation code {status}; {}",
            label.cannot_be(),
            detail.message
        ),
        None => format!("{}; Operation code {status}", label.cannot_be()),
    };
    ReconciliationOutcome::Failure {
        kind: FailureKind::Rejected { status, detail },
        message,
    }
}

fn from_poll_error(
    label: &MutationLabel,
    error: PollError,
    deadline: Duration,
) -> ReconciliationOutcome {
    match error {
        PollError::JobFailed {
            job, description, ..
        } => ReconciliationOutcome::Failure {
            message: format!("{} failed; {description}", label.subject),
            kind: FailureKind::JobFailed { job, description },
        },
        PollError::UnrecognizedStatus {
            job,
            status,
            description,
            ..
        } => ReconciliationOutcome::Failure {
            message: format!(
                "{} reported unrecognized job status {status:?}; {description}",
                label.subject
            ),
            kind: FailureKind::UnrecognizedStatus {
                job,
                status,
                description,
            },
        },
        PollError::DeadlineExceeded {
            job,
            polls,
            last_description,
            last_error,
        } => {
            let mut message = format!(
                "{} timed out after {deadline:?} waiting for job {job}; remote state unknown",
                label.subject
            );
            if let Some(description) = last_description.as_deref().filter(|d| !d.is_empty()) {
                message.push_str(&format!("; last status: {description}"));
            }
            if let Some(error) = &last_error {
                message.push_str(&format!("; last error: {error}"));
            }
            ReconciliationOutcome::Failure {
                kind: FailureKind::TimedOut {
                    job,
                    polls,
                    last_description,
                },
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::job::JobState;
    use crate::reconcile::poller::DEFAULT_JOB_TIMEOUT;
    use crate::reconcile::testing::ScriptedApi;

    #[derive(Debug, Clone, PartialEq)]
    struct AssignAmount {
        plan: &'static str,
        amount: u32,
    }

    const REQUEST: AssignAmount = AssignAmount {
        plan: "standard",
        amount: 3,
    };

    fn label() -> MutationLabel {
        MutationLabel::new("BTP Sub Account Entitlements", Operation::Update)
    }

    fn fast() -> PollConfig {
        PollConfig {
            base_delay_ms: 10,
            max_delay_ms: 50,
        }
    }

    fn accepted(job: &str) -> Result<ImmediateResult, String> {
        Ok(ImmediateResult::accepted(202, JobHandle::new(job)))
    }

    async fn run(api: &ScriptedApi<AssignAmount>, acceptance: Acceptance) -> ReconciliationOutcome {
        Reconciler::new(api, acceptance)
            .with_poll_config(fast())
            .reconcile(&label(), &REQUEST, DEFAULT_JOB_TIMEOUT)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn completed_on_first_poll_succeeds() {
        let api = ScriptedApi::new()
            .submit(accepted("J0"))
            .poll(Ok(JobState::completed()));
        let outcome = run(&api, Acceptance::ACCEPTED).await;
        assert_eq!(outcome, ReconciliationOutcome::Success);
        assert_eq!(api.poll_calls(), 1);
        assert_eq!(api.submitted(), vec![REQUEST]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_progress_then_completed_succeeds() {
        let api = ScriptedApi::new()
            .submit(accepted("J1"))
            .poll(Ok(JobState::in_progress("applying")))
            .poll(Ok(JobState::completed()));
        let outcome = run(&api, Acceptance::ACCEPTED).await;
        assert!(outcome.is_success());
        assert_eq!(api.poll_calls(), 2);
        assert_eq!(api.polled(), vec![JobHandle::new("J1"), JobHandle::new("J1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn job_failure_surfaces_description() {
        let api = ScriptedApi::new()
            .submit(accepted("J2"))
            .poll(Ok(JobState::failed("quota exceeded")))
            .poll(Ok(JobState::completed()));
        let outcome = run(&api, Acceptance::ACCEPTED).await;

        assert_eq!(
            outcome.kind(),
            Some(&FailureKind::JobFailed {
                job: JobHandle::new("J2"),
                description: "quota exceeded".into(),
            })
        );
        assert_eq!(
            outcome.message(),
            Some("BTP Sub Account Entitlements failed; quota exceeded")
        );
        assert_eq!(api.poll_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn endless_in_progress_times_out_distinctly() {
        let api = ScriptedApi::new()
            .submit(accepted("J3"))
            .poll(Ok(JobState::in_progress("applying")));
        let outcome = run(&api, Acceptance::ACCEPTED).await;

        assert!(outcome.is_timeout());
        assert!(!outcome.kind().unwrap().is_definitive());
        let message = outcome.message().unwrap();
        assert!(message.contains("timed out after 120s"), "{message}");
        assert!(message.contains("remote state unknown"), "{message}");
        assert!(message.contains("last status: applying"), "{message}");
        assert!(api.poll_calls() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_deadline_is_reported_in_millis() {
        let api = ScriptedApi::new()
            .submit(accepted("J3b"))
            .poll(Ok(JobState::in_progress("")));
        let outcome = Reconciler::new(&api, Acceptance::ACCEPTED)
            .with_poll_config(fast())
            .reconcile(&label(), &REQUEST, Duration::from_millis(500))
            .await;

        assert!(outcome.is_timeout());
        let message = outcome.message().unwrap();
        assert!(message.contains("timed out after 500ms"), "{message}");
        assert!(!message.contains("last status"), "{message}");
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_fails_without_looping() {
        let api = ScriptedApi::new()
            .submit(accepted("J4"))
            .poll(Ok(JobState::new("SUSPENDED", "hold")))
            .poll(Ok(JobState::completed()));
        let outcome = run(&api, Acceptance::ACCEPTED).await;

        assert!(matches!(
            outcome.kind(),
            Some(FailureKind::UnrecognizedStatus { status, .. }) if status == "SUSPENDED"
        ));
        assert!(!outcome.is_timeout());
        assert_eq!(api.poll_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_code_never_polls() {
        let api = ScriptedApi::new()
            .submit(Ok(ImmediateResult::rejected(
                409,
                Some(RemoteError {
                    code: Some("11006".into()),
                    message: "assignment already in progress".into(),
                }),
            )))
            .poll(Ok(JobState::completed()));
        let outcome = run(&api, Acceptance::ACCEPTED).await;

        assert_eq!(
            outcome.message(),
            Some(concat!(
                "BTP Sub Account Entitlements can't be updated; ",
                "Operation code 409; assignment already in progress"
            ))
        );
        assert!(matches!(
            outcome.kind(),
            Some(FailureKind::Rejected { status: 409, .. })
        ));
        assert_eq!(api.poll_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_success_code_is_rejected() {
        // 200 where the endpoint only ever answers 202.
        let api = ScriptedApi::new().submit(Ok(ImmediateResult::completed(200)));
        let outcome = run(&api, Acceptance::ACCEPTED).await;
        assert_eq!(
            outcome.message(),
            Some("BTP Sub Account Entitlements can't be updated; Operation code 200")
        );
        assert_eq!(api.poll_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn error_payload_fails_even_with_accepted_code() {
        let api = ScriptedApi::new().submit(Ok(ImmediateResult {
            status_code: 202,
            job: Some(JobHandle::new("J5")),
            error: Some(RemoteError {
                code: None,
                message: "partially invalid".into(),
            }),
        }));
        let outcome = run(&api, Acceptance::ACCEPTED).await;
        assert!(!outcome.is_success());
        assert_eq!(api.poll_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_never_polls() {
        let api = ScriptedApi::new()
            .submit(Err("500 connection reset by peer".into()))
            .poll(Ok(JobState::completed()));
        let outcome = run(&api, Acceptance::ACCEPTED).await;

        assert_eq!(
            outcome.kind(),
            Some(&FailureKind::Transport("500 connection reset by peer".into()))
        );
        assert_eq!(
            outcome.message(),
            Some("BTP Sub Account Entitlements can't be updated; 500 connection reset by peer")
        );
        assert_eq!(api.poll_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn synchronous_completion_needs_no_polls() {
        let api = ScriptedApi::new().submit(Ok(ImmediateResult::completed(200)));
        let outcome = run(&api, Acceptance::OK).await;
        assert!(outcome.is_success());
        assert_eq!(api.poll_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ok_with_job_handle_still_waits_for_job() {
        let api = ScriptedApi::new()
            .submit(Ok(ImmediateResult::accepted(200, JobHandle::new("D1"))))
            .poll(Ok(JobState::in_progress("")))
            .poll(Ok(JobState::failed("directory locked")));
        let outcome = run(&api, Acceptance::OK).await;
        assert_eq!(
            outcome.message(),
            Some("BTP Sub Account Entitlements failed; directory locked")
        );
        assert_eq!(api.poll_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resubmitting_after_success_succeeds_again() {
        let api = ScriptedApi::new()
            .submit(accepted("J6"))
            .poll(Ok(JobState::completed()));
        let reconciler = Reconciler::new(&api, Acceptance::ACCEPTED).with_poll_config(fast());

        let first = reconciler
            .reconcile(&label(), &REQUEST, DEFAULT_JOB_TIMEOUT)
            .await;
        let second = reconciler
            .reconcile(&label(), &REQUEST, DEFAULT_JOB_TIMEOUT)
            .await;

        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(api.submit_calls(), 2);
        assert_eq!(api.submitted(), vec![REQUEST, REQUEST]);
    }

    #[tokio::test(start_paused = true)]
    async fn report_records_job_and_polls() {
        let api = ScriptedApi::new()
            .submit(accepted("J7"))
            .poll(Ok(JobState::in_progress("")))
            .poll(Ok(JobState::completed()));
        let (outcome, report) = Reconciler::new(&api, Acceptance::ACCEPTED)
            .with_poll_config(fast())
            .reconcile_with_report(&label(), &REQUEST, DEFAULT_JOB_TIMEOUT)
            .await;

        assert!(outcome.is_success());
        assert!(report.succeeded);
        assert_eq!(report.job, Some(JobHandle::new("J7")));
        assert_eq!(report.polls, 2);
        assert_eq!(report.operation, "update BTP Sub Account Entitlements");
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::Create.to_string(), "create");
        assert_eq!(Operation::Delete.past_tense(), "deleted");
        assert_eq!(Acceptance::ACCEPTED.code(), 202);
        assert_eq!(Acceptance::status(204).code(), 204);
    }
}
