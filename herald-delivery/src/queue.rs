//! The background job queue collaborator.
//!
//! The queue stores submitted delivery jobs and runs them later from
//! its own workers; retry and backoff policy belong to the queue, not
//! to this crate. [`MemoryQueue`] is the in-memory implementation used
//! for development and tests: it records submissions and lets a caller
//! drain them into [`crate::Herald::run_job`].

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use ulid::Ulid;

use crate::{error::QueueError, job::JobPayload};

/// Identifier assigned to a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Ulid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Scheduling options passed through to the queue.
///
/// All fields are optional; an empty schedule means "run as soon as a
/// worker is free, on the environment's default queue".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Run the job after this delay.
    pub delay: Option<Duration>,
    /// Run the job at (or after) this absolute time. Takes precedence
    /// over `delay` when both are set.
    pub run_at: Option<SystemTime>,
    /// Queue name; defaults to the environment's later-delivery queue,
    /// resolved at submission time.
    pub queue: Option<String>,
}

impl Schedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub const fn run_at(mut self, run_at: SystemTime) -> Self {
        self.run_at = Some(run_at);
        self
    }

    #[must_use]
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// The earliest time the job should run, relative to `now`.
    #[must_use]
    pub fn due_at(&self, now: SystemTime) -> SystemTime {
        self.run_at
            .unwrap_or_else(|| now + self.delay.unwrap_or_default())
    }

    /// Fill in the queue name if the caller left it unset.
    pub(crate) fn with_default_queue(mut self, queue: &str) -> Self {
        if self.queue.is_none() {
            self.queue = Some(queue.to_string());
        }
        self
    }
}

/// Submits serialized delivery jobs for later execution.
#[async_trait]
pub trait Queue: Send + Sync + std::fmt::Debug {
    /// Submit one job with the given schedule.
    ///
    /// The payload must survive serialization: it is the only state that
    /// crosses into the worker that eventually executes the job.
    ///
    /// # Errors
    /// [`QueueError`] if the submission is rejected.
    async fn submit(&self, payload: JobPayload, schedule: &Schedule) -> Result<JobId, QueueError>;
}

/// A job recorded by [`MemoryQueue`].
#[derive(Debug, Clone)]
pub struct SubmittedJob {
    pub id: JobId,
    /// The queue-transportable form of the payload.
    pub payload: serde_json::Value,
    pub schedule: Schedule,
    pub submitted_at: SystemTime,
}

/// In-memory implementation of [`Queue`].
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<SubmittedJob>>,
    closed: AtomicBool,
    notify: Notify,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Snapshot of held jobs, in submission order.
    #[must_use]
    pub fn jobs(&self) -> Vec<SubmittedJob> {
        self.jobs.lock().clone()
    }

    /// Remove and return all held jobs, in submission order.
    #[must_use]
    pub fn drain(&self) -> Vec<SubmittedJob> {
        std::mem::take(&mut *self.jobs.lock())
    }

    /// Refuse further submissions.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Wait until at least `expected` jobs have been submitted.
    ///
    /// # Errors
    /// Returns an error if the timeout elapses first.
    pub async fn wait_for_count(
        &self,
        expected: usize,
        timeout: Duration,
    ) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, async {
            loop {
                if self.len() >= expected {
                    return;
                }
                self.notify.notified().await;
            }
        })
        .await
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn submit(&self, payload: JobPayload, schedule: &Schedule) -> Result<JobId, QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }

        let payload =
            serde_json::to_value(&payload).map_err(|e| QueueError::Submit(e.to_string()))?;
        let job = SubmittedJob {
            id: JobId::new(),
            payload,
            schedule: schedule.clone(),
            submitted_at: SystemTime::now(),
        };
        let id = job.id;
        self.jobs.lock().push(job);
        self.notify.notify_waiters();
        Ok(id)
    }
}
