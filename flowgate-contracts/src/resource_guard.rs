use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest process-wide sample published by the resource guard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_pct: f32,
    pub mem_pct: f32,
    pub task_count: u64,
    pub heap_bytes: u64,
    pub sampled_at: DateTime<Utc>,
}

/// Classification of the latest snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResourceVerdict {
    Safe,
    Warn,
    Overloaded,
}

/// Advisory resource classifier. Never kills work itself; the admission
/// controller decides what to do with `classify()`/`protector_latched()`.
pub trait ResourceGuard: Send + Sync {
    fn snapshot(&self) -> ResourceSnapshot;

    fn classify(&self) -> ResourceVerdict;

    /// `true` while protector mode is latched: the guard has returned
    /// `Overloaded` for `protector_enter_samples` consecutive samples and
    /// hasn't yet seen `protector_leave_samples` consecutive `Safe` ones.
    fn protector_latched(&self) -> bool;

    /// Best-effort hint for a `Retry-After` header when refusing due to
    /// overload: time until the next scheduled sample.
    fn retry_after(&self) -> std::time::Duration;
}
