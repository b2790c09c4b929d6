use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use flowgate_contracts::resource_guard::{ResourceGuard, ResourceSnapshot, ResourceVerdict};
use parking_lot::Mutex;

/// Deterministic `ResourceGuard` fake. Tests drive its verdict and latch
/// directly rather than waiting on real sampling.
pub struct FixedResourceGuard {
    verdict: Mutex<ResourceVerdict>,
    latched: AtomicBool,
}

impl Default for FixedResourceGuard {
    fn default() -> Self {
        Self {
            verdict: Mutex::new(ResourceVerdict::Safe),
            latched: AtomicBool::new(false),
        }
    }
}

impl FixedResourceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_verdict(&self, verdict: ResourceVerdict) {
        *self.verdict.lock() = verdict;
    }

    pub fn set_latched(&self, latched: bool) {
        self.latched.store(latched, Ordering::SeqCst);
    }
}

impl ResourceGuard for FixedResourceGuard {
    fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu_pct: 0.0,
            mem_pct: 0.0,
            task_count: 0,
            heap_bytes: 0,
            sampled_at: Utc::now(),
        }
    }

    fn classify(&self) -> ResourceVerdict {
        *self.verdict.lock()
    }

    fn protector_latched(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }

    fn retry_after(&self) -> Duration {
        Duration::from_secs(10)
    }
}
