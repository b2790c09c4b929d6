//! Trait surfaces the admission and dispatch pipeline (`flowgate-core`) is
//! built against. Every trait here abstracts a backend (the shared
//! key-value store or the worker queue) so production code can
//! run against Redis while tests run against in-memory fakes implementing
//! the same trait.

pub mod concurrency;
pub mod pending_ops;
pub mod queue;
pub mod rate_limiter;
pub mod resource_guard;
pub mod usage_ledger;

pub mod prelude {
    pub use super::concurrency::{ConcurrencyError, ConcurrencyGate, ConcurrencyPermit};
    pub use super::pending_ops::{PendingOpError, PendingOperationStore};
    pub use super::queue::{Acknowledgment, QueueError, QueueService};
    pub use super::rate_limiter::{
        RateLimitDecision, RateLimitError, RateLimitRule, RateLimiter,
    };
    pub use super::resource_guard::{ResourceGuard, ResourceSnapshot, ResourceVerdict};
    pub use super::usage_ledger::{LedgerError, QuotaCheck, QuotaViolation, UsageLedger};
}
