//! Scripted remote capabilities for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::job::{ImmediateResult, JobHandle, JobState};
use super::poller::JobStatusSource;
use super::reconciler::MutationSubmitter;

/// Answers submits and polls from scripted queues and records every call.
///
/// The last scripted answer of each queue is sticky: once only one remains,
/// it is returned for every further call.
pub(crate) struct ScriptedApi<R> {
    submits: Mutex<VecDeque<Result<ImmediateResult, String>>>,
    polls: Mutex<VecDeque<Result<JobState, String>>>,
    poll_delay: Option<Duration>,
    submit_calls: AtomicU32,
    poll_calls: AtomicU32,
    submitted: Mutex<Vec<R>>,
    polled: Mutex<Vec<JobHandle>>,
}

impl<R> ScriptedApi<R> {
    pub(crate) fn new() -> Self {
        Self {
            submits: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
            poll_delay: None,
            submit_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
            polled: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn submit(self, result: Result<ImmediateResult, String>) -> Self {
        self.submits.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn poll(self, result: Result<JobState, String>) -> Self {
        self.polls.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = Some(delay);
        self
    }

    pub(crate) fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn polled(&self) -> Vec<JobHandle> {
        self.polled.lock().unwrap().clone()
    }

    pub(crate) fn submitted(&self) -> Vec<R>
    where
        R: Clone,
    {
        self.submitted.lock().unwrap().clone()
    }
}

fn next_sticky<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl<R: Clone> MutationSubmitter<R> for ScriptedApi<R> {
    type Error = String;

    async fn submit(&self, request: &R) -> Result<ImmediateResult, String> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request.clone());
        next_sticky(&self.submits).unwrap_or_else(|| Err("no scripted submit".into()))
    }
}

impl<R> JobStatusSource for ScriptedApi<R> {
    type Error = String;

    async fn job_status(&self, job: &JobHandle) -> Result<JobState, String> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polled.lock().unwrap().push(job.clone());
        if let Some(delay) = self.poll_delay {
            tokio::time::sleep(delay).await;
        }
        next_sticky(&self.polls).unwrap_or_else(|| Err("no scripted poll".into()))
    }
}
