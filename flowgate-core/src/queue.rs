use async_trait::async_trait;
use flowgate_contracts::queue::{Acknowledgment, QueueError, QueueService};
use flowgate_model::batch::BatchId;
use flowgate_model::job::{Job, JobId, Lane};
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;

const JOB_TTL_SECS: i64 = 24 * 3600;
const BATCH_INDEX_TTL_SECS: i64 = 24 * 3600;

/// Priority score a lane's jobs carry once moved there, inverted from the
/// score-to-lane table. Shared by the Redis queue's `promote` and the in-memory fake
/// so both agree on what score a promoted job ends up with.
pub(crate) fn score_for_lane(lane: Lane) -> u8 {
    match lane {
        Lane::Critical => 10,
        Lane::High => 8,
        Lane::Normal => 6,
        Lane::Low => 3,
        Lane::Default => 1,
    }
}

mod scripts {
    use redis::Script;

    /// Atomic lane move: removes one occurrence of `job_id` from the `from`
    /// list and, only if it was actually present, pushes it onto the `to`
    /// list. Returns 0 if the job had already been dequeued by the time the
    /// rescorer or immediate-promotion caller got to it.
    pub fn promote() -> Script {
        Script::new(
            r#"
            local from_key = KEYS[1]
            local to_key = KEYS[2]
            local job_id = ARGV[1]

            local removed = redis.call('LREM', from_key, 1, job_id)
            if removed == 0 then
                return 0
            end
            redis.call('RPUSH', to_key, job_id)
            return 1
            "#,
        )
    }
}

/// Redis-backed `QueueService`. Each lane is a Redis list of job ids;
/// the job payload itself lives at a separate key so promoting a job across
/// lanes never needs to touch more than one list at a time.
pub struct RedisQueueService {
    redis: ConnectionManager,
}

impl RedisQueueService {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    fn lane_key(lane: Lane) -> String {
        format!("queue:lane:{lane}")
    }

    fn job_key(job_id: JobId) -> String {
        format!("queue:job:{job_id}")
    }

    fn batch_key(batch_id: BatchId) -> String {
        format!("queue:batch:{batch_id}")
    }

    async fn store_job(&self, conn: &mut ConnectionManager, job: &Job) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Backend(e.into()))?;
        redis::AsyncCommands::set_ex::<_, _, ()>(conn, Self::job_key(job.id), payload, JOB_TTL_SECS as u64)
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        if let Some(batch_id) = job.batch_id {
            let batch_key = Self::batch_key(batch_id);
            redis::AsyncCommands::sadd::<_, _, ()>(conn, &batch_key, job.id.to_string())
                .await
                .map_err(|e| QueueError::Backend(e.into()))?;
            redis::AsyncCommands::expire::<_, ()>(conn, &batch_key, BATCH_INDEX_TTL_SECS)
                .await
                .map_err(|e| QueueError::Backend(e.into()))?;
        }
        Ok(())
    }

    async fn load_job(
        &self,
        conn: &mut ConnectionManager,
        job_id: JobId,
    ) -> Result<Option<Job>, QueueError> {
        let payload: Option<String> =
            redis::AsyncCommands::get(conn, Self::job_key(job_id))
                .await
                .map_err(|e| QueueError::Backend(e.into()))?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(|e| QueueError::Backend(e.into())))
            .transpose()
    }
}

#[async_trait]
impl QueueService for RedisQueueService {
    async fn enqueue(&self, job: Job) -> Result<Acknowledgment, QueueError> {
        let mut conn = self.redis.clone();
        let lane = job.lane();
        let job_id = job.id;
        self.store_job(&mut conn, &job).await?;
        redis::AsyncCommands::rpush::<_, _, ()>(&mut conn, Self::lane_key(lane), job_id.to_string())
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        Ok(Acknowledgment {
            job_id,
            lane,
            estimated_wait: Duration::ZERO,
        })
    }

    async fn dequeue_next(&self) -> Result<Option<Job>, QueueError> {
        let mut conn = self.redis.clone();
        for lane in Lane::all_descending() {
            let popped: Option<String> =
                redis::AsyncCommands::lpop(&mut conn, Self::lane_key(*lane), None)
                    .await
                    .map_err(|e| QueueError::Backend(e.into()))?;
            let Some(id_str) = popped else { continue };
            let job_id = JobId(
                id_str
                    .parse()
                    .map_err(|e: uuid::Error| QueueError::Backend(e.into()))?,
            );
            if let Some(job) = self.load_job(&mut conn, job_id).await? {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    async fn queue_depth(&self, lane: Lane) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let len: usize = redis::AsyncCommands::llen(&mut conn, Self::lane_key(lane))
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        Ok(len)
    }

    async fn peek_lane(&self, lane: Lane) -> Result<Vec<Job>, QueueError> {
        let mut conn = self.redis.clone();
        let ids: Vec<String> =
            redis::AsyncCommands::lrange(&mut conn, Self::lane_key(lane), 0, -1)
                .await
                .map_err(|e| QueueError::Backend(e.into()))?;
        let mut jobs = Vec::with_capacity(ids.len());
        for id_str in ids {
            let Ok(uuid) = id_str.parse() else { continue };
            if let Some(job) = self.load_job(&mut conn, JobId(uuid)).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn promote(&self, job_id: JobId, from: Lane, to: Lane) -> Result<bool, QueueError> {
        let mut conn = self.redis.clone();

        let script: Script = scripts::promote();
        let moved: i64 = script
            .key(Self::lane_key(from))
            .key(Self::lane_key(to))
            .arg(job_id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;

        if moved == 1 {
            if let Some(mut job) = self.load_job(&mut conn, job_id).await? {
                job.priority_score = score_for_lane(to);
                self.store_job(&mut conn, &job).await?;
            }
        }
        Ok(moved == 1)
    }

    async fn cancel_queued(&self, job_id: JobId, lane: Lane) -> Result<bool, QueueError> {
        let mut conn = self.redis.clone();
        let removed: i64 = redis::AsyncCommands::lrem(
            &mut conn,
            Self::lane_key(lane),
            1,
            job_id.to_string(),
        )
        .await
        .map_err(|e| QueueError::Backend(e.into()))?;
        if removed > 0 {
            let _: Result<(), _> =
                redis::AsyncCommands::del(&mut conn, Self::job_key(job_id)).await;
        }
        Ok(removed > 0)
    }

    async fn jobs_by_batch(&self, batch_id: BatchId) -> Result<Vec<Job>, QueueError> {
        let mut conn = self.redis.clone();
        let ids: Vec<String> = redis::AsyncCommands::smembers(&mut conn, Self::batch_key(batch_id))
            .await
            .map_err(|e| QueueError::Backend(e.into()))?;
        let mut jobs = Vec::with_capacity(ids.len());
        for id_str in ids {
            let Ok(uuid) = id_str.parse() else { continue };
            if let Some(job) = self.load_job(&mut conn, JobId(uuid)).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}
