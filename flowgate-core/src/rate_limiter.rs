use std::time::Duration;

use async_trait::async_trait;
use flowgate_contracts::rate_limiter::{
    RateLimitDecision, RateLimitError, RateLimitRule, RateLimiter,
};
use flowgate_model::identity::IdentityId;
use redis::aio::ConnectionManager;
use redis::Script;
use tracing::warn;

const RATE_WINDOW_TTL_SECS: i64 = 120;
const ABUSE_COUNT_TTL_SECS: i64 = 5 * 60;
const ABUSE_MARK_TTL_SECS: i64 = 15 * 60;
const ABUSE_THRESHOLD: u32 = 10;
const ABUSE_PENALTY_MULTIPLIER: f64 = 0.5;

mod scripts {
    use redis::Script;

    /// Sliding-window-log admit, fused with abuse-mark bookkeeping so the
    /// whole decision is one atomic Redis call per identity: drop
    /// entries older than `now - window`, count what remains, admit-and-append
    /// if under the abuse-adjusted limit, else bump the abuse counter and
    /// latch the mark once it crosses the threshold.
    pub fn admit() -> Script {
        Script::new(
            r#"
            local window_key = KEYS[1]
            local abuse_mark_key = KEYS[2]
            local abuse_count_key = KEYS[3]
            local now_ms = tonumber(ARGV[1])
            local window_ms = tonumber(ARGV[2])
            local base_limit = tonumber(ARGV[3])
            local burst = tonumber(ARGV[4])
            local penalty_multiplier = tonumber(ARGV[5])
            local abuse_threshold = tonumber(ARGV[6])
            local abuse_count_ttl = tonumber(ARGV[7])
            local abuse_mark_ttl = tonumber(ARGV[8])
            local window_ttl = tonumber(ARGV[9])

            local abuse_marked = redis.call('EXISTS', abuse_mark_key) == 1
            local effective_limit = base_limit + burst
            if abuse_marked then
                effective_limit = math.floor(base_limit * penalty_multiplier) + burst
            end

            redis.call('ZREMRANGEBYSCORE', window_key, 0, now_ms - window_ms)
            local count = redis.call('ZCARD', window_key)

            if count < effective_limit then
                redis.call('ZADD', window_key, now_ms, now_ms)
                redis.call('EXPIRE', window_key, window_ttl)
                return {1, count + 1, effective_limit, 0, abuse_marked and 1 or 0}
            end

            local oldest = redis.call('ZRANGE', window_key, 0, 0, 'WITHSCORES')
            local reset_ms = window_ms
            if oldest[2] then
                reset_ms = (tonumber(oldest[2]) + window_ms) - now_ms
            end

            local violations = redis.call('INCR', abuse_count_key)
            redis.call('EXPIRE', abuse_count_key, abuse_count_ttl)
            if violations > abuse_threshold then
                redis.call('SET', abuse_mark_key, '1', 'EX', abuse_mark_ttl)
                abuse_marked = true
            end

            return {0, count, effective_limit, reset_ms, abuse_marked and 1 or 0, violations}
            "#,
        )
    }
}

/// Redis-backed `RateLimiter`. Fails closed on backend errors:
/// unlike the usage ledger, there is no permissive fallback here.
pub struct RedisRateLimiter {
    redis: ConnectionManager,
}

impl RedisRateLimiter {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    fn window_key(identity: &IdentityId) -> String {
        format!("ratelimit:{identity}")
    }

    fn abuse_mark_key(identity: &IdentityId) -> String {
        format!("abuse:{identity}")
    }

    fn abuse_count_key(identity: &IdentityId) -> String {
        format!("abuse-count:{identity}")
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn admit(
        &self,
        identity: &IdentityId,
        rule: RateLimitRule,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = rule.window.as_millis() as i64;
        let mut conn = self.redis.clone();

        let script: Script = scripts::admit();
        let result: Vec<i64> = script
            .key(Self::window_key(identity))
            .key(Self::abuse_mark_key(identity))
            .key(Self::abuse_count_key(identity))
            .arg(now_ms)
            .arg(window_ms)
            .arg(rule.base_limit)
            .arg(rule.burst_allowance)
            .arg(ABUSE_PENALTY_MULTIPLIER)
            .arg(ABUSE_THRESHOLD)
            .arg(ABUSE_COUNT_TTL_SECS)
            .arg(ABUSE_MARK_TTL_SECS)
            .arg(RATE_WINDOW_TTL_SECS)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.into()))?;

        let allowed = result[0] == 1;
        let current_count = result[1] as u32;
        let effective_limit = result[2] as u32;
        let reset_after = Duration::from_millis(result[3].max(0) as u64);
        let abuse_marked = result[4] == 1;

        if !allowed {
            let violation_count = result.get(5).copied().unwrap_or(0) as u32;
            warn!(%identity, violation_count, "rate limit rejection");
            return Err(RateLimitError::Exceeded {
                retry_after: reset_after,
                violation_count,
            });
        }

        Ok(RateLimitDecision {
            allowed,
            current_count,
            effective_limit,
            reset_after,
            abuse_marked,
        })
    }

    async fn is_abuse_marked(&self, identity: &IdentityId) -> Result<bool, RateLimitError> {
        let mut conn = self.redis.clone();
        let exists: bool = redis::AsyncCommands::exists(&mut conn, Self::abuse_mark_key(identity))
            .await
            .map_err(|e| RateLimitError::Backend(e.into()))?;
        Ok(exists)
    }
}
