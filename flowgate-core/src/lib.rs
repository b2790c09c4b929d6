//! Admission control, rate limiting, priority scheduling, and job dispatch
//! for the flowgate control plane.

pub mod admission;
pub mod concurrency;
pub mod dispatcher;
pub mod error;
pub mod estimator;
pub mod pending_ops;
pub mod plan_catalog;
pub mod priority;
pub mod queue;
pub mod rate_limiter;
pub mod rescorer;
pub mod resource_guard;
pub mod usage_ledger;
pub mod usage_tracker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use admission::{Admitted, AdmissionController, AdmissionRequest};
pub use dispatcher::{BatchItemRequest, JobDispatcher};
pub use error::AdmissionError;
pub use pending_ops::RedisPendingOperationStore;
pub use plan_catalog::PlanCatalog;
pub use queue::RedisQueueService;
pub use rescorer::PriorityRescorer;
pub use resource_guard::LocalResourceGuard;
pub use usage_tracker::{JobOutcome, UsageTracker};
