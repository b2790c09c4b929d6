use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flowgate_config::ResourceGuardConfig;
use flowgate_contracts::resource_guard::{ResourceGuard, ResourceSnapshot, ResourceVerdict};
use sysinfo::System;
use tokio::sync::watch;
use tracing::{info, warn};

const WARN_CPU_PCT: f32 = 70.0;
const WARN_MEM_PCT: f32 = 70.0;

/// Process-local resource sampler. Polls `sysinfo` on a fixed cadence
/// and publishes the result over a `watch` channel so every request-handling
/// task reads the latest snapshot without contending on a lock.
pub struct LocalResourceGuard {
    config: ResourceGuardConfig,
    snapshot_rx: watch::Receiver<ResourceSnapshot>,
    consecutive_overloaded: Arc<AtomicU32>,
    consecutive_safe: Arc<AtomicU32>,
    latched: Arc<AtomicBool>,
}

impl LocalResourceGuard {
    /// Spawns the background sampling task and returns a handle. The task
    /// runs for the lifetime of the tokio runtime; there is no explicit
    /// shutdown since the guard is process-scoped.
    pub fn spawn(config: ResourceGuardConfig) -> Self {
        let mut system = System::new_all();
        system.refresh_all();

        let initial = sample(&mut system);
        let (tx, snapshot_rx) = watch::channel(initial);

        let consecutive_overloaded = Arc::new(AtomicU32::new(0));
        let consecutive_safe = Arc::new(AtomicU32::new(0));
        let latched = Arc::new(AtomicBool::new(false));

        let task_overloaded = Arc::clone(&consecutive_overloaded);
        let task_safe = Arc::clone(&consecutive_safe);
        let task_latched = Arc::clone(&latched);
        let interval = config.sample_interval;
        let enter_threshold = config.protector_enter_samples;
        let leave_threshold = config.protector_leave_samples;
        let cpu_max = config.cpu_max_pct;
        let mem_max = config.mem_max_pct;
        let tasks_max = config.tasks_max;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                system.refresh_all();
                let snapshot = sample(&mut system);
                let verdict = classify_snapshot(&snapshot, cpu_max, mem_max, tasks_max);

                match verdict {
                    ResourceVerdict::Overloaded => {
                        task_safe.store(0, Ordering::SeqCst);
                        let count = task_overloaded.fetch_add(1, Ordering::SeqCst) + 1;
                        if count >= enter_threshold && !task_latched.load(Ordering::SeqCst) {
                            task_latched.store(true, Ordering::SeqCst);
                            warn!(count, "protector mode latched");
                        }
                    }
                    ResourceVerdict::Safe => {
                        task_overloaded.store(0, Ordering::SeqCst);
                        let count = task_safe.fetch_add(1, Ordering::SeqCst) + 1;
                        if count >= leave_threshold && task_latched.load(Ordering::SeqCst) {
                            task_latched.store(false, Ordering::SeqCst);
                            info!(count, "protector mode cleared");
                        }
                    }
                    ResourceVerdict::Warn => {
                        task_overloaded.store(0, Ordering::SeqCst);
                        task_safe.store(0, Ordering::SeqCst);
                    }
                }

                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });

        Self {
            config,
            snapshot_rx,
            consecutive_overloaded,
            consecutive_safe,
            latched,
        }
    }
}

fn sample(system: &mut System) -> ResourceSnapshot {
    let cpu_pct = system.global_cpu_usage();
    let mem_pct = if system.total_memory() == 0 {
        0.0
    } else {
        (system.used_memory() as f64 / system.total_memory() as f64 * 100.0) as f32
    };
    ResourceSnapshot {
        cpu_pct,
        mem_pct,
        task_count: system.processes().len() as u64,
        heap_bytes: system.used_memory(),
        sampled_at: Utc::now(),
    }
}

fn classify_snapshot(
    snapshot: &ResourceSnapshot,
    cpu_max: f32,
    mem_max: f32,
    tasks_max: u64,
) -> ResourceVerdict {
    if snapshot.cpu_pct > cpu_max || snapshot.mem_pct > mem_max || snapshot.task_count > tasks_max
    {
        ResourceVerdict::Overloaded
    } else if snapshot.cpu_pct > WARN_CPU_PCT || snapshot.mem_pct > WARN_MEM_PCT {
        ResourceVerdict::Warn
    } else {
        ResourceVerdict::Safe
    }
}

impl ResourceGuard for LocalResourceGuard {
    fn snapshot(&self) -> ResourceSnapshot {
        *self.snapshot_rx.borrow()
    }

    fn classify(&self) -> ResourceVerdict {
        let snapshot = self.snapshot();
        classify_snapshot(
            &snapshot,
            self.config.cpu_max_pct,
            self.config.mem_max_pct,
            self.config.tasks_max,
        )
    }

    fn protector_latched(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }

    fn retry_after(&self) -> Duration {
        self.config.sample_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cpu_pct: f32, mem_pct: f32, task_count: u64) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu_pct,
            mem_pct,
            task_count,
            heap_bytes: 0,
            sampled_at: Utc::now(),
        }
    }

    #[test]
    fn classifies_overloaded_on_cpu() {
        let s = snapshot(90.0, 10.0, 1);
        assert_eq!(classify_snapshot(&s, 85.0, 80.0, 10_000), ResourceVerdict::Overloaded);
    }

    #[test]
    fn classifies_overloaded_on_task_count() {
        let s = snapshot(10.0, 10.0, 20_000);
        assert_eq!(classify_snapshot(&s, 85.0, 80.0, 10_000), ResourceVerdict::Overloaded);
    }

    #[test]
    fn classifies_warn_between_thresholds() {
        let s = snapshot(75.0, 10.0, 1);
        assert_eq!(classify_snapshot(&s, 85.0, 80.0, 10_000), ResourceVerdict::Warn);
    }

    #[test]
    fn classifies_safe_below_warn() {
        let s = snapshot(10.0, 10.0, 1);
        assert_eq!(classify_snapshot(&s, 85.0, 80.0, 10_000), ResourceVerdict::Safe);
    }
}
