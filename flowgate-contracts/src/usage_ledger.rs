use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_model::plan::Plan;
use flowgate_model::usage::{QuotaDimension, UsageDelta, UsageRecord};
use flowgate_model::identity::IdentityId;
use thiserror::Error;

/// Durable key-value counter store. Implementations must make
/// `increment` atomic across every counter touched by one call: daily ops,
/// daily bytes and daily pages together succeed or fail as a unit.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Snapshot view; stale reads are tolerated because `check` rereads
    /// atomically against the backend.
    async fn read(&self, identity: &IdentityId) -> Result<UsageRecord, LedgerError>;

    /// Atomically applies `delta` to every relevant counter, rolling any
    /// counter whose window boundary has passed back to zero first.
    async fn increment(
        &self,
        identity: &IdentityId,
        delta: UsageDelta,
    ) -> Result<UsageRecord, LedgerError>;

    /// Read-only evaluation of whether `delta` would break any quota
    /// dimension for `plan`.
    async fn check(
        &self,
        identity: &IdentityId,
        plan: &Plan,
        delta: &UsageDelta,
    ) -> Result<QuotaCheck, LedgerError>;
}

/// Outcome of `UsageLedger::check`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QuotaCheck {
    Ok,
    Violation(QuotaViolation),
}

impl QuotaCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, QuotaCheck::Ok)
    }
}

/// Structured detail of which quota dimension tripped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuotaViolation {
    pub dimension: QuotaDimension,
    pub current: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
}

/// Errors raised by a `UsageLedger` backend.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backend failed beyond `ledger_retries` attempts. Ledger
    /// failures are permissive: admission proceeds and this is logged as a
    /// reconciliation event rather than propagated to the caller.
    #[error("usage ledger backend unavailable after retries: {0}")]
    BackendTransient(#[source] anyhow::Error),
}
