use std::sync::Arc;
use std::time::Duration;

use flowgate_contracts::concurrency::{ConcurrencyError, ConcurrencyGate, ConcurrencyPermit};
use flowgate_contracts::pending_ops::PendingOperationStore;
use flowgate_contracts::rate_limiter::{RateLimitError, RateLimitRule, RateLimiter};
use flowgate_contracts::resource_guard::{ResourceGuard, ResourceVerdict};
use flowgate_contracts::usage_ledger::{QuotaCheck, UsageLedger};
use flowgate_model::identity::Identity;
use flowgate_model::job::{JobId, PendingOperation};
use flowgate_model::operation::{FeatureCheck, OperationKind};
use tracing::warn;

use crate::error::{AdmissionError, Result};
use crate::estimator::{self, EstimationHint};
use crate::plan_catalog::PlanCatalog;

/// One inbound request's admission parameters. `job_id` is supplied by the
/// caller rather than generated inside `admit` so the staged
/// `PendingOperation` and the job the caller goes on to enqueue always agree
/// on the same id.
#[derive(Clone, Debug)]
pub struct AdmissionRequest {
    pub job_id: JobId,
    pub identity: Identity,
    pub kind: OperationKind,
    pub declared_bytes: u64,
    pub declared_pages: Option<u64>,
}

/// Outcome of a successful admission: the staged record the usage tracker
/// later consumes, plus the concurrency permit the caller is responsible
/// for releasing on the job's terminal state.
#[derive(Clone, Debug)]
pub struct Admitted {
    pub pending: PendingOperation,
    pub permit: ConcurrencyPermit,
}

/// Composes the resource guard, usage ledger, rate limiter, and
/// concurrency gate into a single accept/reject decision, in the exact step
/// order: cheap checks first, resources acquired only
/// once every refusal is ruled out.
pub struct AdmissionController {
    guard: Arc<dyn ResourceGuard>,
    ledger: Arc<dyn UsageLedger>,
    rate_limiter: Arc<dyn RateLimiter>,
    concurrency: Arc<dyn ConcurrencyGate>,
    pending_store: Arc<dyn PendingOperationStore>,
    plans: PlanCatalog,
    absolute_max_bytes: u64,
    rate_window: Duration,
}

impl AdmissionController {
    pub fn new(
        guard: Arc<dyn ResourceGuard>,
        ledger: Arc<dyn UsageLedger>,
        rate_limiter: Arc<dyn RateLimiter>,
        concurrency: Arc<dyn ConcurrencyGate>,
        pending_store: Arc<dyn PendingOperationStore>,
        plans: PlanCatalog,
        absolute_max_bytes: u64,
        rate_window: Duration,
    ) -> Self {
        Self {
            guard,
            ledger,
            rate_limiter,
            concurrency,
            pending_store,
            plans,
            absolute_max_bytes,
            rate_window,
        }
    }

    /// Releases a concurrency slot acquired by a successful `admit` call
    /// and discards its staged `PendingOperation`, for use when something
    /// downstream of admission (e.g. enqueueing the job) fails before the
    /// job ever reaches a terminal state the usage tracker would otherwise
    /// release it on.
    pub async fn release_on_dispatch_failure(
        &self,
        job_id: JobId,
        permit: ConcurrencyPermit,
    ) -> Result<()> {
        if let Err(err) = self.pending_store.discard(job_id).await {
            warn!(%job_id, %err, "failed to discard staged pending operation after dispatch failure");
        }
        self.concurrency
            .release(permit)
            .await
            .map_err(AdmissionError::from)
    }

    pub async fn admit(&self, request: AdmissionRequest) -> Result<Admitted> {
        // 1. Guard check.
        if self.guard.protector_latched()
            || self.guard.classify() == ResourceVerdict::Overloaded
        {
            return Err(AdmissionError::InternalOverload {
                retry_after: self.guard.retry_after(),
            });
        }

        // 2. Absolute envelope.
        if request.declared_bytes > self.absolute_max_bytes {
            return Err(AdmissionError::AbsoluteSizeExceeded {
                size: request.declared_bytes,
                max: self.absolute_max_bytes,
            });
        }

        // 3. Plan lookup.
        let plan = self
            .plans
            .get(request.identity.plan)
            .cloned()
            .ok_or(AdmissionError::Unauthenticated)?;

        // 4. Plan size cap.
        if request.declared_bytes > plan.max_file_size_bytes {
            return Err(AdmissionError::PlanSizeExceeded {
                size: request.declared_bytes,
                max: plan.max_file_size_bytes,
                plan: plan.name,
            });
        }

        // 5. Feature gate.
        if let FeatureCheck::Required(false) = request.kind.required_feature(&plan.features) {
            return Err(AdmissionError::FeatureNotAllowed { plan: plan.name });
        }

        // 6. Quota probe. Permissive on backend failure.
        let delta = estimator::estimate_delta(
            request.kind,
            EstimationHint {
                declared_bytes: request.declared_bytes,
                declared_pages: request.declared_pages,
            },
        );
        match self.ledger.check(&request.identity.id, &plan, &delta).await {
            Ok(QuotaCheck::Violation(violation)) => {
                return Err(AdmissionError::QuotaExceeded {
                    dimension: violation.dimension,
                    current: violation.current,
                    limit: violation.limit,
                    reset_time: violation.reset_at,
                });
            }
            Ok(QuotaCheck::Ok) => {}
            Err(err) => {
                warn!(identity = %request.identity.id, %err, "usage ledger unavailable, proceeding permissively");
            }
        }

        // 7. Concurrency slot.
        let permit = self
            .concurrency
            .acquire(&request.identity.id, plan.max_concurrent)
            .await
            .map_err(|err| match err {
                ConcurrencyError::Exceeded => AdmissionError::ConcurrencyExceeded,
                ConcurrencyError::Backend(e) => AdmissionError::BackendTransient(e),
            })?;

        // 8. Rate check. Releases the slot acquired above on any refusal
        // (step ordering guarantees this is deterministic, never a leak).
        let rule = RateLimitRule {
            window: self.rate_window,
            base_limit: plan.rate_limit_per_min,
            burst_allowance: plan.burst_allowance,
        };
        if let Err(err) = self.rate_limiter.admit(&request.identity.id, rule).await {
            let _ = self.concurrency.release(permit).await;
            return Err(match err {
                RateLimitError::Exceeded { retry_after, .. } => {
                    AdmissionError::RateLimited { retry_after }
                }
                RateLimitError::Backend(e) => AdmissionError::BackendTransient(e),
            });
        }

        // 9. Reserve.
        let pending = PendingOperation::new(
            request.job_id,
            request.identity.id.clone(),
            request.kind,
            plan,
            delta,
        );

        if let Err(err) = self.pending_store.stage(pending.clone()).await {
            warn!(job_id = %pending.job_id, %err, "failed to stage pending operation, usage tracking for this job will be skipped on completion");
        }

        Ok(Admitted { pending, permit })
    }
}
