use async_trait::async_trait;
use flowgate_model::job::{Job, Lane};
use thiserror::Error;
use std::time::Duration;

/// Returned by a successful `enqueue`.
#[derive(Clone, Debug, PartialEq)]
pub struct Acknowledgment {
    pub job_id: flowgate_model::job::JobId,
    pub lane: Lane,
    pub estimated_wait: Duration,
}

/// Abstracts the priority-lane queue backend consumed by the dispatcher.
/// Implementations must honor: FIFO within a lane, strict priority
/// across lanes.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Appends `job` to its lane's FIFO. Non-blocking; backend transients
    /// shorter than the configured retry bound are retried internally by
    /// the implementation and never observed by the caller.
    async fn enqueue(&self, job: Job) -> Result<Acknowledgment, QueueError>;

    /// Pops the next job, preferring strictly higher lanes. Returns `None`
    /// if every lane is empty.
    async fn dequeue_next(&self) -> Result<Option<Job>, QueueError>;

    /// Number of jobs currently waiting in `lane`.
    async fn queue_depth(&self, lane: Lane) -> Result<usize, QueueError>;

    /// Snapshot of every job currently waiting in `lane`, without dequeuing
    /// any of them. Used by the background rescorer to decide which queued
    /// jobs have aged or retried enough to move up a lane.
    async fn peek_lane(&self, lane: Lane) -> Result<Vec<Job>, QueueError>;

    /// Moves a queued job into a higher lane without changing its FIFO
    /// position within the destination lane's insertion order. Used by the
    /// background priority rescorer and by immediate promotion.
    async fn promote(
        &self,
        job_id: flowgate_model::job::JobId,
        from: Lane,
        to: Lane,
    ) -> Result<bool, QueueError>;

    /// Removes a queued-but-not-yet-dequeued job. A distinct operation from
    /// batch cancellation: jobs already enqueued stay scheduled
    /// unless this is called explicitly.
    async fn cancel_queued(
        &self,
        job_id: flowgate_model::job::JobId,
        lane: Lane,
    ) -> Result<bool, QueueError>;

    /// Jobs still known to the queue backend for `batch_id`. Used to answer
    /// batch status polls by reconstructing aggregate state from the jobs
    /// themselves rather than an owning pointer. A job that
    /// has already been dequeued and completed may no longer be present;
    /// callers treat a missing job as "no longer queued here".
    async fn jobs_by_batch(
        &self,
        batch_id: flowgate_model::batch::BatchId,
    ) -> Result<Vec<Job>, QueueError>;
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue backend unavailable beyond retry bound: {0}")]
    BackendUnavailable(#[source] anyhow::Error),

    #[error("queue backend error: {0}")]
    Backend(#[source] anyhow::Error),
}
