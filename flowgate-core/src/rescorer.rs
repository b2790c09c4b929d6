use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flowgate_contracts::queue::{QueueError, QueueService};
use flowgate_model::job::{Job, Lane};
use tracing::{info, warn};

use crate::priority;

/// Background process that re-scores queued jobs at a fixed cadence and
/// promotes any that have aged or retried enough to move up a lane.
/// Promotion never demotes: a job whose freshly computed lane is lower than
/// or equal to the one it's already in is left alone.
pub struct PriorityRescorer {
    queue: Arc<dyn QueueService>,
    interval: Duration,
}

impl PriorityRescorer {
    /// Spawns the rescoring loop and returns a handle. Runs for the
    /// lifetime of the tokio runtime; there is no explicit shutdown since
    /// the rescorer is process-scoped, same as the resource guard sampler.
    pub fn spawn(queue: Arc<dyn QueueService>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let rescorer = Self { queue, interval };
        tokio::spawn(async move { rescorer.run().await })
    }

    async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.rescore_once().await {
                warn!(%err, "priority rescore pass failed");
            }
        }
    }

    async fn rescore_once(&self) -> Result<(), QueueError> {
        let now = Utc::now();
        let mut promoted = 0u32;

        for &lane in Lane::all_descending() {
            for job in self.queue.peek_lane(lane).await? {
                let wait = job.wait(now).to_std().unwrap_or(Duration::ZERO);
                if let Some(target) = next_lane(&job, lane, wait) {
                    match self.queue.promote(job.id, lane, target).await {
                        Ok(true) => promoted += 1,
                        Ok(false) => {}
                        Err(err) => warn!(job_id = %job.id, %err, "failed to promote job"),
                    }
                }
            }
        }

        if promoted > 0 {
            info!(promoted, "priority rescore pass promoted jobs");
        }
        Ok(())
    }
}

/// Decides whether `job`, currently waiting in `lane`, should move up. The
/// immediate-promotion rule bypasses the score formula entirely and sends
/// the job straight to `normal`; otherwise the plain scoring formula decides.
/// Returns `None` when the computed lane is not strictly higher than the
/// current one.
fn next_lane(job: &Job, lane: Lane, wait: Duration) -> Option<Lane> {
    let target = if priority::should_promote_immediately(wait, job.priority_score) {
        Lane::Normal
    } else {
        let score = priority::score(job.plan.name, wait, job.retry_count, 0);
        Lane::from_score(score)
    };

    if (target as u8) > (lane as u8) {
        Some(target)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_model::identity::IdentityId;
    use flowgate_model::operation::OperationKind;
    use flowgate_model::plan::{Plan, PlanFeatures, PlanName};

    fn test_plan(name: PlanName) -> Plan {
        Plan {
            name,
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
                watermark: false,
                office_conversion: false,
            },
        }
    }

    fn test_job(plan: PlanName, priority_score: u8) -> Job {
        let mut job = Job::new(
            IdentityId::new("acme"),
            test_plan(plan),
            OperationKind::Pdf,
            "blob-1",
        );
        job.priority_score = priority_score;
        job
    }

    #[test]
    fn does_not_promote_a_fresh_job() {
        let job = test_job(PlanName::Free, 1);
        assert_eq!(next_lane(&job, Lane::Default, Duration::ZERO), None);
    }

    #[test]
    fn promotes_after_thirty_minutes_regardless_of_score_or_plan() {
        let job = test_job(PlanName::Free, 9);
        let target = next_lane(&job, Lane::Critical, Duration::from_secs(31 * 60));
        assert_eq!(target, None, "already in the highest lane");

        let job = test_job(PlanName::Free, 1);
        let target = next_lane(&job, Lane::Default, Duration::from_secs(31 * 60));
        assert_eq!(target, Some(Lane::Normal));
    }

    #[test]
    fn never_proposes_a_demotion() {
        let job = test_job(PlanName::Corporate, 10);
        assert_eq!(next_lane(&job, Lane::Critical, Duration::from_secs(3600)), None);
    }
}
