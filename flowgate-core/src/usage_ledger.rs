use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use flowgate_model::identity::IdentityId;
use flowgate_model::plan::Plan;
use flowgate_model::usage::{QuotaDimension, UsageDelta, UsageRecord};
use flowgate_contracts::usage_ledger::{LedgerError, QuotaCheck, QuotaViolation, UsageLedger};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::warn;

const DAY_TTL_SECS: i64 = 25 * 3600;
const MONTH_TTL_SECS: i64 = 32 * 24 * 3600;

/// Redis-backed `UsageLedger`. Counters are keyed by calendar date/month
/// directly in the key name (`usage:{identity}:day:{YYYY-MM-DD}`), so a
/// window rollover needs no explicit reset logic: yesterday's key simply
/// expires and today's key starts from zero.
pub struct RedisUsageLedger {
    redis: ConnectionManager,
    retries: u32,
}

mod scripts {
    use redis::Script;

    /// Atomically increments four day-hash fields and three month-hash
    /// fields together, then sets both TTLs. Returns the eight resulting
    /// counters in a fixed order.
    pub fn increment() -> Script {
        Script::new(
            r#"
            local day_key = KEYS[1]
            local month_key = KEYS[2]
            local ops = tonumber(ARGV[1])
            local bytes = tonumber(ARGV[2])
            local pages = tonumber(ARGV[3])
            local ai_pages = tonumber(ARGV[4])
            local day_ttl = tonumber(ARGV[5])
            local month_ttl = tonumber(ARGV[6])

            local day_ops = redis.call('HINCRBY', day_key, 'operations', ops)
            local day_bytes = redis.call('HINCRBY', day_key, 'bytes', bytes)
            local day_pages = redis.call('HINCRBY', day_key, 'pages', pages)
            local day_ai_pages = redis.call('HINCRBY', day_key, 'ai_pages', ai_pages)
            redis.call('EXPIRE', day_key, day_ttl)

            local month_ops = redis.call('HINCRBY', month_key, 'operations', ops)
            local month_bytes = redis.call('HINCRBY', month_key, 'bytes', bytes)
            local month_pages = redis.call('HINCRBY', month_key, 'pages', pages)
            redis.call('EXPIRE', month_key, month_ttl)

            return {day_ops, day_bytes, day_pages, day_ai_pages, month_ops, month_bytes, month_pages}
            "#,
        )
    }
}

impl RedisUsageLedger {
    pub async fn connect(redis_url: &str, retries: u32) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis, retries })
    }

    fn day_key(identity: &IdentityId, now: DateTime<Utc>) -> String {
        format!("usage:{identity}:day:{}", now.format("%Y-%m-%d"))
    }

    fn month_key(identity: &IdentityId, now: DateTime<Utc>) -> String {
        format!("usage:{identity}:month:{}", now.format("%Y-%m"))
    }

    fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = now.date_naive().succ_opt().unwrap_or(now.date_naive());
        Utc.from_utc_datetime(&tomorrow.and_hms_opt(0, 0, 0).unwrap())
    }

    fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
        let (year, month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().unwrap_or(now)
    }

    async fn read_hashes(
        &self,
        identity: &IdentityId,
    ) -> redis::RedisResult<(
        std::collections::HashMap<String, i64>,
        std::collections::HashMap<String, i64>,
    )> {
        let now = Utc::now();
        let mut conn = self.redis.clone();
        let day: std::collections::HashMap<String, i64> =
            conn.hgetall(Self::day_key(identity, now)).await?;
        let month: std::collections::HashMap<String, i64> =
            conn.hgetall(Self::month_key(identity, now)).await?;
        Ok((day, month))
    }

    async fn read_record(&self, identity: &IdentityId) -> anyhow::Result<UsageRecord> {
        let now = Utc::now();
        let (day, month) = self.read_hashes(identity).await?;
        Ok(UsageRecord {
            operations_today: day.get("operations").copied().unwrap_or(0) as u64,
            operations_this_month: month.get("operations").copied().unwrap_or(0) as u64,
            bytes_today: day.get("bytes").copied().unwrap_or(0) as u64,
            bytes_this_month: month.get("bytes").copied().unwrap_or(0) as u64,
            pages_today: day.get("pages").copied().unwrap_or(0) as u64,
            pages_this_month: month.get("pages").copied().unwrap_or(0) as u64,
            ai_pages_today: day.get("ai_pages").copied().unwrap_or(0) as u64,
            daily_reset_at: Some(Self::next_midnight(now)),
            monthly_reset_at: Some(Self::next_month_start(now)),
        })
    }
}

#[async_trait]
impl UsageLedger for RedisUsageLedger {
    async fn read(&self, identity: &IdentityId) -> Result<UsageRecord, LedgerError> {
        with_retries(self.retries, || self.read_record(identity)).await
    }

    async fn increment(
        &self,
        identity: &IdentityId,
        delta: UsageDelta,
    ) -> Result<UsageRecord, LedgerError> {
        let now = Utc::now();
        let day_key = Self::day_key(identity, now);
        let month_key = Self::month_key(identity, now);

        with_retries(self.retries, || {
            let mut conn = self.redis.clone();
            let script: Script = scripts::increment();
            async move {
                let result: Vec<i64> = script
                    .key(&day_key)
                    .key(&month_key)
                    .arg(delta.operations)
                    .arg(delta.bytes)
                    .arg(delta.pages)
                    .arg(delta.ai_pages)
                    .arg(DAY_TTL_SECS)
                    .arg(MONTH_TTL_SECS)
                    .invoke_async(&mut conn)
                    .await?;

                Ok(UsageRecord {
                    operations_today: result[0] as u64,
                    bytes_today: result[1] as u64,
                    pages_today: result[2] as u64,
                    ai_pages_today: result[3] as u64,
                    operations_this_month: result[4] as u64,
                    bytes_this_month: result[5] as u64,
                    pages_this_month: result[6] as u64,
                    daily_reset_at: Some(Self::next_midnight(now)),
                    monthly_reset_at: Some(Self::next_month_start(now)),
                })
            }
        })
        .await
    }

    async fn check(
        &self,
        identity: &IdentityId,
        plan: &Plan,
        delta: &UsageDelta,
    ) -> Result<QuotaCheck, LedgerError> {
        let record = with_retries(self.retries, || self.read_record(identity)).await?;
        Ok(evaluate(&record, plan, delta))
    }
}

/// Pure evaluation of a proposed delta against a plan's quota limits.
/// Checked in a fixed dimension order so `current_usage` reported to the
/// caller is always the first dimension that would actually break.
pub fn evaluate(record: &UsageRecord, plan: &Plan, delta: &UsageDelta) -> QuotaCheck {
    let now = Utc::now();
    let daily_reset = record.daily_reset_at.unwrap_or(now);
    let monthly_reset = record.monthly_reset_at.unwrap_or(now);

    let checks = [
        (
            QuotaDimension::DailyOperations,
            record.operations_today,
            delta.operations,
            plan.max_ops_day,
            daily_reset,
        ),
        (
            QuotaDimension::MonthlyOperations,
            record.operations_this_month,
            delta.operations,
            plan.max_ops_month,
            monthly_reset,
        ),
        (
            QuotaDimension::DailyPages,
            record.pages_today,
            delta.pages,
            plan.max_pages_day,
            daily_reset,
        ),
        (
            QuotaDimension::MonthlyPages,
            record.pages_this_month,
            delta.pages,
            plan.max_pages_month,
            monthly_reset,
        ),
    ];

    for (dimension, current, delta_amount, limit, reset_at) in checks {
        if current + delta_amount > limit {
            return QuotaCheck::Violation(QuotaViolation {
                dimension,
                current,
                limit,
                reset_at,
            });
        }
    }

    QuotaCheck::Ok
}

async fn with_retries<T, F, Fut>(retries: u32, mut op: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries => {
                attempt += 1;
                let backoff = Duration::from_millis(50 * 2u64.pow(attempt));
                warn!(attempt, %err, "usage ledger backend call failed, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(LedgerError::BackendTransient(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_model::plan::{PlanFeatures, PlanName};

    fn test_plan() -> Plan {
        Plan {
            name: PlanName::Free,
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
                watermark: true,
                office_conversion: false,
            },
        }
    }

    #[test]
    fn tenth_operation_is_ok_eleventh_violates() {
        let plan = test_plan();
        let mut record = UsageRecord {
            daily_reset_at: Some(Utc::now()),
            monthly_reset_at: Some(Utc::now()),
            ..Default::default()
        };
        record.operations_today = 9;
        let delta = UsageDelta::new(1, 1, 1, 0);
        assert!(evaluate(&record, &plan, &delta).is_ok());

        record.operations_today = 10;
        match evaluate(&record, &plan, &delta) {
            QuotaCheck::Violation(v) => {
                assert_eq!(v.dimension, QuotaDimension::DailyOperations);
                assert_eq!(v.limit, 10);
            }
            QuotaCheck::Ok => panic!("expected violation"),
        }
    }
}
