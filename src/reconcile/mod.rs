mod job;
mod poller;
mod reconciler;
#[cfg(test)]
pub(crate) mod testing;

pub use job::{
    FailureKind, ImmediateResult, JobHandle, JobState, JobStatus, ReconcileReport,
    ReconciliationOutcome, RemoteError,
};
pub use poller::{
    CompletedJob, DEFAULT_JOB_TIMEOUT, JobStatusSource, MIN_POLL_DELAY_MS, PollConfig, PollError,
    poll_until_terminal,
};
pub use reconciler::{Acceptance, MutationLabel, MutationSubmitter, Operation, Reconciler};
