use async_trait::async_trait;
use flowgate_model::job::{JobId, PendingOperation};
use thiserror::Error;

/// Holds admission-staged `PendingOperation`s keyed by job id until the
/// usage tracker consumes them at job completion. The gap between admission
/// and completion can span the lifetime of a worker, so this has to be a
/// real backend rather than in-process state tied to the request task.
#[async_trait]
pub trait PendingOperationStore: Send + Sync {
    /// Stages `pending` under its own job id, overwriting any previous
    /// record for that id.
    async fn stage(&self, pending: PendingOperation) -> Result<(), PendingOpError>;

    /// Atomically removes and returns the staged record for `job_id`, if
    /// any. A second call for the same id returns `None`, which is what
    /// makes completion handling idempotent under redelivery.
    async fn take(&self, job_id: JobId) -> Result<Option<PendingOperation>, PendingOpError>;

    /// Removes a staged record without it ever being consumed for
    /// completion accounting. Used when a job fails to reach the queue
    /// after admission already staged it.
    async fn discard(&self, job_id: JobId) -> Result<(), PendingOpError>;
}

#[derive(Error, Debug)]
pub enum PendingOpError {
    #[error("pending operation store backend error: {0}")]
    Backend(#[source] anyhow::Error),
}
