use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use flowgate_contracts::rate_limiter::{
    RateLimitDecision, RateLimitError, RateLimitRule, RateLimiter,
};
use flowgate_model::identity::IdentityId;
use parking_lot::Mutex;
use tokio::time::Instant;

const ABUSE_THRESHOLD: u32 = 10;
const ABUSE_WINDOW: Duration = Duration::from_secs(5 * 60);
const ABUSE_MARK_DURATION: Duration = Duration::from_secs(15 * 60);
const ABUSE_PENALTY_MULTIPLIER: f64 = 0.5;

#[derive(Default)]
struct IdentityState {
    timestamps: VecDeque<Instant>,
    violations: VecDeque<Instant>,
    abuse_marked_until: Option<Instant>,
}

/// In-memory sliding-window rate limiter used by tests. Uses `tokio::time`
/// so scenarios can drive it deterministically with `tokio::time::pause`
/// and `advance` instead of sleeping in real time.
#[derive(Default)]
pub struct InMemoryRateLimiter {
    state: DashMap<IdentityId, Mutex<IdentityState>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn admit(
        &self,
        identity: &IdentityId,
        rule: RateLimitRule,
    ) -> Result<RateLimitDecision, RateLimitError> {
        self.state.entry(identity.clone()).or_default();
        let entry = self.state.get(identity).expect("just inserted");
        let mut state = entry.lock();
        let now = Instant::now();

        let abuse_marked = state
            .abuse_marked_until
            .map(|until| until > now)
            .unwrap_or(false);

        let effective_limit = if abuse_marked {
            (((rule.base_limit as f64) * ABUSE_PENALTY_MULTIPLIER) as u32) + rule.burst_allowance
        } else {
            rule.base_limit + rule.burst_allowance
        };

        let window_start = now.checked_sub(rule.window).unwrap_or(now);
        state.timestamps.retain(|&t| t > window_start);

        let count = state.timestamps.len() as u32;
        if count < effective_limit {
            state.timestamps.push_back(now);
            return Ok(RateLimitDecision {
                allowed: true,
                current_count: count + 1,
                effective_limit,
                reset_after: Duration::ZERO,
                abuse_marked,
            });
        }

        let reset_after = state
            .timestamps
            .front()
            .map(|&oldest| (oldest + rule.window).saturating_duration_since(now))
            .unwrap_or(rule.window);

        let abuse_window_start = now.checked_sub(ABUSE_WINDOW).unwrap_or(now);
        state.violations.retain(|&t| t > abuse_window_start);
        state.violations.push_back(now);
        let violation_count = state.violations.len() as u32;
        if violation_count > ABUSE_THRESHOLD {
            state.abuse_marked_until = Some(now + ABUSE_MARK_DURATION);
        }

        Err(RateLimitError::Exceeded {
            retry_after: reset_after,
            violation_count,
        })
    }

    async fn is_abuse_marked(&self, identity: &IdentityId) -> Result<bool, RateLimitError> {
        let now = Instant::now();
        Ok(self
            .state
            .get(identity)
            .map(|entry| {
                entry
                    .lock()
                    .abuse_marked_until
                    .map(|until| until > now)
                    .unwrap_or(false)
            })
            .unwrap_or(false))
    }
}
