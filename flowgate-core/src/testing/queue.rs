use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use flowgate_contracts::queue::{Acknowledgment, QueueError, QueueService};
use flowgate_model::job::{Job, JobId, Lane};
use parking_lot::Mutex;

use crate::queue::score_for_lane;

/// In-process, non-persistent stand-in for the worker-queue backend.
/// Used by unit and integration tests so they don't need a real broker.
#[derive(Default)]
pub struct InMemoryQueue {
    lanes: DashMap<Lane, Mutex<VecDeque<Job>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane_queue(&self, lane: Lane) -> dashmap::mapref::one::Ref<'_, Lane, Mutex<VecDeque<Job>>> {
        self.lanes.entry(lane).or_default();
        self.lanes.get(&lane).expect("just inserted")
    }
}

#[async_trait]
impl QueueService for InMemoryQueue {
    async fn enqueue(&self, job: Job) -> Result<Acknowledgment, QueueError> {
        let lane = job.lane();
        let job_id = job.id;
        self.lane_queue(lane).lock().push_back(job);
        Ok(Acknowledgment {
            job_id,
            lane,
            estimated_wait: Duration::ZERO,
        })
    }

    async fn dequeue_next(&self) -> Result<Option<Job>, QueueError> {
        for lane in Lane::all_descending() {
            if let Some(entry) = self.lanes.get(lane) {
                if let Some(job) = entry.lock().pop_front() {
                    return Ok(Some(job));
                }
            }
        }
        Ok(None)
    }

    async fn queue_depth(&self, lane: Lane) -> Result<usize, QueueError> {
        Ok(self
            .lanes
            .get(&lane)
            .map(|q| q.lock().len())
            .unwrap_or(0))
    }

    async fn peek_lane(&self, lane: Lane) -> Result<Vec<Job>, QueueError> {
        Ok(self
            .lanes
            .get(&lane)
            .map(|q| q.lock().iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn promote(&self, job_id: JobId, from: Lane, to: Lane) -> Result<bool, QueueError> {
        let Some(entry) = self.lanes.get(&from) else {
            return Ok(false);
        };
        let mut from_queue = entry.lock();
        let Some(pos) = from_queue.iter().position(|j| j.id == job_id) else {
            return Ok(false);
        };
        let mut job = from_queue.remove(pos).expect("position just found");
        drop(from_queue);
        job.priority_score = score_for_lane(to);
        self.lane_queue(to).lock().push_back(job);
        Ok(true)
    }

    async fn cancel_queued(&self, job_id: JobId, lane: Lane) -> Result<bool, QueueError> {
        let Some(entry) = self.lanes.get(&lane) else {
            return Ok(false);
        };
        let mut queue = entry.lock();
        if let Some(pos) = queue.iter().position(|j| j.id == job_id) {
            queue.remove(pos);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn jobs_by_batch(
        &self,
        batch_id: flowgate_model::batch::BatchId,
    ) -> Result<Vec<Job>, QueueError> {
        let mut found = Vec::new();
        for lane in self.lanes.iter() {
            for job in lane.value().lock().iter() {
                if job.batch_id == Some(batch_id) {
                    found.push(job.clone());
                }
            }
        }
        Ok(found)
    }
}
