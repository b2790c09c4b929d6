use std::sync::Arc;

use flowgate_contracts::concurrency::{ConcurrencyGate, ConcurrencyPermit};
use flowgate_contracts::pending_ops::PendingOperationStore;
use flowgate_contracts::usage_ledger::UsageLedger;
use flowgate_model::job::JobId;
use flowgate_model::usage::UsageDelta;
use tracing::{error, info};

/// What actually happened to a job, reported by the worker side once it
/// reaches a terminal state.
#[derive(Clone, Debug)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub actual_bytes: u64,
    pub actual_pages: u64,
    pub actual_ai_pages: u64,
    pub succeeded: bool,
}

/// Consumes the `PendingOperation` staged at admission time plus the job's
/// actual outcome, applies the corrected delta to the usage ledger, and
/// releases the concurrency slot regardless of outcome. Idempotent per job
/// id: the staging store's `take` is a one-shot read, so a redelivered
/// outcome for a job already processed finds nothing staged and is a no-op.
pub struct UsageTracker {
    ledger: Arc<dyn UsageLedger>,
    concurrency: Arc<dyn ConcurrencyGate>,
    pending_store: Arc<dyn PendingOperationStore>,
}

impl UsageTracker {
    pub fn new(
        ledger: Arc<dyn UsageLedger>,
        concurrency: Arc<dyn ConcurrencyGate>,
        pending_store: Arc<dyn PendingOperationStore>,
    ) -> Self {
        Self {
            ledger,
            concurrency,
            pending_store,
        }
    }

    pub async fn record_completion(&self, job_id: JobId, outcome: JobOutcome) {
        let pending = match self.pending_store.take(job_id).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                info!(%job_id, "no staged pending operation; already processed or unknown job");
                return;
            }
            Err(err) => {
                error!(%job_id, %err, "failed to read staged pending operation");
                return;
            }
        };

        let delta = UsageDelta::new(
            1,
            outcome.actual_bytes,
            outcome.actual_pages,
            outcome.actual_ai_pages,
        );

        if let Err(err) = self.ledger.increment(&pending.identity, delta).await {
            error!(%job_id, %err, "failed to record actual usage after retries");
        }

        let permit = ConcurrencyPermit {
            identity: pending.identity.clone(),
        };
        if let Err(err) = self.concurrency.release(permit).await {
            error!(%job_id, %err, "failed to release concurrency slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryConcurrencyGate, InMemoryLedger, InMemoryPendingOperationStore};
    use flowgate_model::identity::IdentityId;
    use flowgate_model::operation::OperationKind;
    use flowgate_model::plan::{Plan, PlanFeatures, PlanName};
    use flowgate_model::job::PendingOperation;

    fn test_plan() -> Plan {
        Plan {
            name: PlanName::Free,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_concurrent: 2,
            max_ops_day: 10,
            max_ops_month: 200,
            max_pages_day: 50,
            max_pages_month: 1_000,
            rate_limit_per_min: 30,
            burst_allowance: 0,
            batch_fanout: 3,
            features: PlanFeatures {
                ai_ocr: false,
                watermark: true,
                office_conversion: false,
            },
        }
    }

    #[tokio::test]
    async fn redelivered_outcome_does_not_double_count() {
        let ledger = Arc::new(InMemoryLedger::new());
        let concurrency = Arc::new(InMemoryConcurrencyGate::new());
        let pending_store = Arc::new(InMemoryPendingOperationStore::new());
        let tracker = UsageTracker::new(ledger.clone(), concurrency.clone(), pending_store.clone());

        let identity = IdentityId::new("acme");
        let pending = PendingOperation::new(
            JobId::new(),
            identity.clone(),
            OperationKind::Pdf,
            test_plan(),
            UsageDelta::new(1, 1024, 1, 0),
        );
        let job_id = pending.job_id;
        pending_store.stage(pending).await.unwrap();

        let outcome = JobOutcome {
            job_id,
            actual_bytes: 2048,
            actual_pages: 3,
            actual_ai_pages: 0,
            succeeded: true,
        };

        tracker.record_completion(job_id, outcome.clone()).await;
        tracker.record_completion(job_id, outcome).await;

        let record = ledger.read(&identity).await.unwrap();
        assert_eq!(record.operations_today, 1);
        assert_eq!(record.bytes_today, 2048);
        assert_eq!(record.pages_today, 3);
    }

    #[tokio::test]
    async fn records_zero_pages_for_a_job_that_never_processed_any() {
        let ledger = Arc::new(InMemoryLedger::new());
        let concurrency = Arc::new(InMemoryConcurrencyGate::new());
        let pending_store = Arc::new(InMemoryPendingOperationStore::new());
        let tracker = UsageTracker::new(ledger.clone(), concurrency.clone(), pending_store.clone());

        let identity = IdentityId::new("acme");
        let pending = PendingOperation::new(
            JobId::new(),
            identity.clone(),
            OperationKind::Pdf,
            test_plan(),
            UsageDelta::new(1, 1024, 1, 0),
        );
        let job_id = pending.job_id;
        pending_store.stage(pending).await.unwrap();

        tracker
            .record_completion(
                job_id,
                JobOutcome {
                    job_id,
                    actual_bytes: 0,
                    actual_pages: 0,
                    actual_ai_pages: 0,
                    succeeded: false,
                },
            )
            .await;

        let record = ledger.read(&identity).await.unwrap();
        assert_eq!(record.pages_today, 0);
    }
}
