use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use flowgate_contracts::queue::{Acknowledgment, QueueError, QueueService};
use flowgate_model::batch::{BatchId, BatchItemOutcome, BatchReceipt};
use flowgate_model::identity::Identity;
use flowgate_model::job::{Job, JobId, Lane};
use flowgate_model::operation::OperationKind;
use flowgate_model::plan::Plan;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::admission::{AdmissionController, AdmissionRequest};
use crate::priority;

/// One item in a batch fan-out request. `kind` is taken as raw text because
/// callers submit batches before any per-item validation has happened; the
/// dispatcher is where an unrecognized operation kind first surfaces as a
/// structured per-item failure rather than aborting the whole batch.
#[derive(Clone, Debug)]
pub struct BatchItemRequest {
    pub kind: String,
    pub blob_id: String,
    pub declared_bytes: u64,
    pub declared_pages: Option<u64>,
}

/// Enqueues individual jobs with a priority lane chosen by the scoring
/// formula, and fans a batch out under a plan-sized semaphore with a
/// wall-clock timeout.
pub struct JobDispatcher {
    queue: Arc<dyn QueueService>,
    batch_timeout: Duration,
}

impl JobDispatcher {
    pub fn new(queue: Arc<dyn QueueService>, batch_timeout: Duration) -> Self {
        Self {
            queue,
            batch_timeout,
        }
    }

    /// Scores a freshly-created job (wait = 0, since it has not queued yet)
    /// and enqueues it on the resulting lane.
    pub async fn enqueue(&self, mut job: Job) -> Result<Acknowledgment, QueueError> {
        job.priority_score = priority::score(job.plan.name, Duration::ZERO, job.retry_count, 0);
        self.queue.enqueue(job).await
    }

    /// Fans a batch out under a plan-sized semaphore, running each item
    /// through `AdmissionController::admit` before it ever reaches the
    /// queue, exactly as the single-item path does. An item that fails
    /// admission is reported as a structured per-item failure rather than
    /// aborting the rest of the batch.
    pub async fn enqueue_batch(
        &self,
        identity: Identity,
        plan: Plan,
        items: Vec<BatchItemRequest>,
        admission: Arc<AdmissionController>,
    ) -> BatchReceipt {
        let batch_id = BatchId::new();
        let total_items = items.len();
        let semaphore = Arc::new(Semaphore::new(plan.batch_fanout.max(1)));

        let tasks = items.into_iter().map(|item| {
            let semaphore = Arc::clone(&semaphore);
            let identity = identity.clone();
            let queue = Arc::clone(&self.queue);
            let admission = Arc::clone(&admission);
            let batch_id = batch_id;

            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return BatchItemOutcome::Failed {
                            error_kind: "semaphore_closed".to_string(),
                            message: "dispatcher semaphore closed".to_string(),
                        };
                    }
                };

                let kind = match OperationKind::from_str(&item.kind) {
                    Ok(kind) => kind,
                    Err(err) => {
                        return BatchItemOutcome::Failed {
                            error_kind: "invalid_operation_kind".to_string(),
                            message: err.to_string(),
                        };
                    }
                };

                let job_id = JobId::new();
                let admitted = match admission
                    .admit(AdmissionRequest {
                        job_id,
                        identity: identity.clone(),
                        kind,
                        declared_bytes: item.declared_bytes,
                        declared_pages: item.declared_pages,
                    })
                    .await
                {
                    Ok(admitted) => admitted,
                    Err(err) => {
                        return BatchItemOutcome::Failed {
                            error_kind: err.code().to_string(),
                            message: err.to_string(),
                        };
                    }
                };

                let mut job =
                    Job::new_with_id(job_id, identity.id, admitted.pending.plan, kind, item.blob_id)
                        .with_batch(batch_id);
                job.priority_score = priority::score(job.plan.name, Duration::ZERO, 0, 0);

                match queue.enqueue(job).await {
                    Ok(ack) => BatchItemOutcome::Queued { job_id: ack.job_id },
                    Err(err) => {
                        warn!(%err, "batch item enqueue failed");
                        if let Err(release_err) = admission
                            .release_on_dispatch_failure(job_id, admitted.permit)
                            .await
                        {
                            warn!(%release_err, "failed to release admission state after batch enqueue failure");
                        }
                        BatchItemOutcome::Failed {
                            error_kind: "queue_backend_error".to_string(),
                            message: err.to_string(),
                        }
                    }
                }
            }
        });

        let mut in_flight: FuturesUnordered<_> = tasks.collect();
        let mut outcomes = Vec::with_capacity(total_items);
        let deadline = tokio::time::Instant::now() + self.batch_timeout;

        loop {
            if outcomes.len() == total_items {
                break;
            }
            tokio::select! {
                biased;
                next = in_flight.next() => {
                    match next {
                        Some(outcome) => outcomes.push(outcome),
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(%batch_id, remaining = total_items - outcomes.len(), "batch fan-out exceeded wall-clock timeout");
                    while outcomes.len() < total_items {
                        outcomes.push(BatchItemOutcome::Failed {
                            error_kind: "batch_timeout".to_string(),
                            message: format!("batch exceeded {:?} timeout", self.batch_timeout),
                        });
                    }
                    break;
                }
            }
        }

        BatchReceipt::new(batch_id, outcomes)
    }

    pub async fn queue_depth(&self, lane: Lane) -> Result<usize, QueueError> {
        self.queue.queue_depth(lane).await
    }

    pub async fn jobs_by_batch(
        &self,
        batch_id: flowgate_model::batch::BatchId,
    ) -> Result<Vec<Job>, QueueError> {
        self.queue.jobs_by_batch(batch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_catalog::PlanCatalog;
    use crate::testing::{
        FixedResourceGuard, InMemoryConcurrencyGate, InMemoryLedger, InMemoryPendingOperationStore,
        InMemoryQueue, InMemoryRateLimiter,
    };
    use flowgate_model::identity::IdentityId;
    use flowgate_model::plan::{PlanFeatures, PlanName};

    fn test_admission(plan: Plan) -> Arc<AdmissionController> {
        Arc::new(AdmissionController::new(
            Arc::new(FixedResourceGuard::new()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryRateLimiter::new()),
            Arc::new(InMemoryConcurrencyGate::new()),
            Arc::new(InMemoryPendingOperationStore::new()),
            PlanCatalog::new(vec![plan]),
            200 * 1024 * 1024,
            Duration::from_secs(60),
        ))
    }

    fn test_plan(fanout: usize) -> Plan {
        Plan {
            name: PlanName::Pro,
            max_file_size_bytes: 150 * 1024 * 1024,
            max_concurrent: 10,
            max_ops_day: 2_000,
            max_ops_month: 40_000,
            max_pages_day: 10_000,
            max_pages_month: 200_000,
            rate_limit_per_min: 300,
            burst_allowance: 30,
            batch_fanout: fanout,
            features: PlanFeatures {
                ai_ocr: true,
                watermark: false,
                office_conversion: true,
            },
        }
    }

    #[tokio::test]
    async fn batch_with_one_invalid_kind_reports_partial_failure() {
        let queue = Arc::new(InMemoryQueue::new());
        let dispatcher = JobDispatcher::new(queue, Duration::from_secs(600));
        let plan = test_plan(10);
        let identity = Identity::new(IdentityId::new("acme-corp"), plan.name);
        let admission = test_admission(plan.clone());
        let items = vec![
            BatchItemRequest { kind: "pdf".into(), blob_id: "b1".into(), declared_bytes: 1024, declared_pages: Some(1) },
            BatchItemRequest { kind: "pdf".into(), blob_id: "b2".into(), declared_bytes: 1024, declared_pages: Some(1) },
            BatchItemRequest { kind: "not-a-kind".into(), blob_id: "b3".into(), declared_bytes: 1024, declared_pages: Some(1) },
            BatchItemRequest { kind: "ocr".into(), blob_id: "b4".into(), declared_bytes: 1024, declared_pages: Some(1) },
            BatchItemRequest { kind: "office".into(), blob_id: "b5".into(), declared_bytes: 1024, declared_pages: Some(1) },
        ];

        let receipt = dispatcher.enqueue_batch(identity, plan, items, admission).await;
        assert_eq!(receipt.summary.total, 5);
        assert_eq!(receipt.summary.queued, 4);
        assert_eq!(receipt.summary.failed, 1);
    }

    #[tokio::test]
    async fn batch_item_exceeding_plan_size_cap_fails_admission_without_enqueueing() {
        let queue = Arc::new(InMemoryQueue::new());
        let dispatcher = JobDispatcher::new(Arc::clone(&queue), Duration::from_secs(600));
        let plan = test_plan(10);
        let identity = Identity::new(IdentityId::new("acme-corp"), plan.name);
        let admission = test_admission(plan.clone());
        let items = vec![
            BatchItemRequest {
                kind: "pdf".into(),
                blob_id: "b1".into(),
                declared_bytes: plan.max_file_size_bytes + 1,
                declared_pages: Some(1),
            },
        ];

        let receipt = dispatcher.enqueue_batch(identity, plan, items, admission).await;
        assert_eq!(receipt.summary.failed, 1);
        assert_eq!(receipt.summary.queued, 0);
        match &receipt.outcomes[0] {
            BatchItemOutcome::Failed { error_kind, .. } => {
                assert_eq!(error_kind, "plan_size_exceeded");
            }
            other => panic!("expected a failed outcome, got {other:?}"),
        }
    }
}
