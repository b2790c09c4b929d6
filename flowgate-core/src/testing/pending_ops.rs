use async_trait::async_trait;
use dashmap::DashMap;
use flowgate_contracts::pending_ops::{PendingOpError, PendingOperationStore};
use flowgate_model::job::{JobId, PendingOperation};

/// In-process `PendingOperationStore` fake. Used by unit and integration
/// tests so they don't need a real Redis to exercise the admit-then-complete
/// lifecycle.
#[derive(Default)]
pub struct InMemoryPendingOperationStore {
    staged: DashMap<JobId, PendingOperation>,
}

impl InMemoryPendingOperationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingOperationStore for InMemoryPendingOperationStore {
    async fn stage(&self, pending: PendingOperation) -> Result<(), PendingOpError> {
        self.staged.insert(pending.job_id, pending);
        Ok(())
    }

    async fn take(&self, job_id: JobId) -> Result<Option<PendingOperation>, PendingOpError> {
        Ok(self.staged.remove(&job_id).map(|(_, v)| v))
    }

    async fn discard(&self, job_id: JobId) -> Result<(), PendingOpError> {
        self.staged.remove(&job_id);
        Ok(())
    }
}
