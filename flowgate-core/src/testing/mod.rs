//! In-memory fakes implementing the `flowgate-contracts` trait surfaces, for
//! tests that would otherwise need a live Redis instance.

mod concurrency;
mod ledger;
mod pending_ops;
mod queue;
mod rate_limiter;
mod resource_guard;

pub use concurrency::InMemoryConcurrencyGate;
pub use ledger::InMemoryLedger;
pub use pending_ops::InMemoryPendingOperationStore;
pub use queue::InMemoryQueue;
pub use rate_limiter::InMemoryRateLimiter;
pub use resource_guard::FixedResourceGuard;
