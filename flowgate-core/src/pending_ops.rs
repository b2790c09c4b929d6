use async_trait::async_trait;
use flowgate_contracts::pending_ops::{PendingOpError, PendingOperationStore};
use flowgate_model::job::{JobId, PendingOperation};
use redis::aio::ConnectionManager;
use redis::Script;

const STAGE_TTL_SECS: i64 = 24 * 3600;

mod scripts {
    use redis::Script;

    /// Atomic get-then-delete: returns the value if present, and only then
    /// removes the key. A second call for the same key returns nil.
    pub fn take() -> Script {
        Script::new(
            r#"
            local key = KEYS[1]
            local value = redis.call('GET', key)
            if value then
                redis.call('DEL', key)
            end
            return value
            "#,
        )
    }
}

/// Redis-backed `PendingOperationStore`. Each staged record lives at its own
/// key so `take` never has to scan; the TTL is a safety net for a job that
/// is admitted but whose worker never reports completion.
pub struct RedisPendingOperationStore {
    redis: ConnectionManager,
}

impl RedisPendingOperationStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    fn key(job_id: JobId) -> String {
        format!("pending_op:{job_id}")
    }
}

#[async_trait]
impl PendingOperationStore for RedisPendingOperationStore {
    async fn stage(&self, pending: PendingOperation) -> Result<(), PendingOpError> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(&pending).map_err(|e| PendingOpError::Backend(e.into()))?;
        redis::AsyncCommands::set_ex::<_, _, ()>(
            &mut conn,
            Self::key(pending.job_id),
            payload,
            STAGE_TTL_SECS as u64,
        )
        .await
        .map_err(|e| PendingOpError::Backend(e.into()))
    }

    async fn take(&self, job_id: JobId) -> Result<Option<PendingOperation>, PendingOpError> {
        let mut conn = self.redis.clone();
        let payload: Option<String> = scripts::take()
            .key(Self::key(job_id))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| PendingOpError::Backend(e.into()))?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(|e| PendingOpError::Backend(e.into())))
            .transpose()
    }

    async fn discard(&self, job_id: JobId) -> Result<(), PendingOpError> {
        let mut conn = self.redis.clone();
        let _: () = redis::AsyncCommands::del(&mut conn, Self::key(job_id))
            .await
            .map_err(|e| PendingOpError::Backend(e.into()))?;
        Ok(())
    }
}
