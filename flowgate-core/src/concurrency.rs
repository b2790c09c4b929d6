use async_trait::async_trait;
use flowgate_contracts::concurrency::{ConcurrencyError, ConcurrencyGate, ConcurrencyPermit};
use flowgate_model::identity::IdentityId;
use redis::aio::ConnectionManager;
use redis::Script;

const SLOT_TTL_SECS: i64 = 5 * 60;

mod scripts {
    use redis::Script;

    /// Atomic acquire-if-under-limit: increments the counter, checks it
    /// against `max_concurrent`, and rolls back the increment on refusal so
    /// a rejected caller never leaks a slot.
    pub fn acquire() -> Script {
        Script::new(
            r#"
            local key = KEYS[1]
            local max_concurrent = tonumber(ARGV[1])
            local ttl = tonumber(ARGV[2])

            local count = redis.call('INCR', key)
            redis.call('EXPIRE', key, ttl)

            if count > max_concurrent then
                redis.call('DECR', key)
                return 0
            end
            return 1
            "#,
        )
    }
}

/// Redis-backed `ConcurrencyGate`. A 5-minute safety TTL recovers a
/// slot if the process holding it crashes before calling `release`.
pub struct RedisConcurrencyGate {
    redis: ConnectionManager,
}

impl RedisConcurrencyGate {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    fn key(identity: &IdentityId) -> String {
        format!("concurrency:{identity}")
    }
}

#[async_trait]
impl ConcurrencyGate for RedisConcurrencyGate {
    async fn acquire(
        &self,
        identity: &IdentityId,
        max_concurrent: u32,
    ) -> Result<ConcurrencyPermit, ConcurrencyError> {
        let mut conn = self.redis.clone();
        let script: Script = scripts::acquire();
        let acquired: i64 = script
            .key(Self::key(identity))
            .arg(max_concurrent)
            .arg(SLOT_TTL_SECS)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ConcurrencyError::Backend(e.into()))?;

        if acquired == 1 {
            Ok(ConcurrencyPermit {
                identity: identity.clone(),
            })
        } else {
            Err(ConcurrencyError::Exceeded)
        }
    }

    async fn release(&self, permit: ConcurrencyPermit) -> Result<(), ConcurrencyError> {
        let mut conn = self.redis.clone();
        let key = Self::key(&permit.identity);
        let remaining: i64 = redis::AsyncCommands::decr(&mut conn, &key, 1)
            .await
            .map_err(|e| ConcurrencyError::Backend(e.into()))?;
        if remaining <= 0 {
            let _: Result<(), _> = redis::AsyncCommands::del(&mut conn, &key).await;
        }
        Ok(())
    }

    async fn current(&self, identity: &IdentityId) -> Result<u32, ConcurrencyError> {
        let mut conn = self.redis.clone();
        let count: Option<i64> = redis::AsyncCommands::get(&mut conn, Self::key(identity))
            .await
            .map_err(|e| ConcurrencyError::Backend(e.into()))?;
        Ok(count.unwrap_or(0).max(0) as u32)
    }
}
