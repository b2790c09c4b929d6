use std::time::Duration;

use async_trait::async_trait;
use flowgate_model::identity::IdentityId;
use thiserror::Error;

/// The sliding-window parameters the rate limiter evaluates against. Built
/// by the admission controller from the plan catalog; the abuse multiplier
/// and bookkeeping live inside the `RateLimiter` implementation, not here,
/// since they're part of the rate limiter's own state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitRule {
    pub window: Duration,
    pub base_limit: u32,
    pub burst_allowance: u32,
}

/// Decision returned by a successful `admit` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current_count: u32,
    pub effective_limit: u32,
    pub reset_after: Duration,
    pub abuse_marked: bool,
}

/// Per-identity sliding-window rate limiter plus abuse-penalty subsystem
/// `admit` must be atomic with respect to concurrent callers on the
/// same identity: drop-old, count, conditionally-append-and-accept is one
/// indivisible step.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn admit(
        &self,
        identity: &IdentityId,
        rule: RateLimitRule,
    ) -> Result<RateLimitDecision, RateLimitError>;

    /// `true` if the identity currently carries an `AbuseMark`.
    async fn is_abuse_marked(&self, identity: &IdentityId) -> Result<bool, RateLimitError>;
}

/// Errors raised by a `RateLimiter` backend. Unlike the ledger, a backend
/// failure here fails *closed*: the integrity of abuse detection
/// depends on the rate primitive, so callers must treat `Backend` as a hard
/// refusal rather than a permissive pass-through.
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    Exceeded {
        retry_after: Duration,
        violation_count: u32,
    },

    #[error("rate limiter backend unavailable: {0}")]
    Backend(#[source] anyhow::Error),
}
