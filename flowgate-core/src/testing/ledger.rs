use async_trait::async_trait;
use dashmap::DashMap;
use flowgate_contracts::usage_ledger::{LedgerError, QuotaCheck, UsageLedger};
use flowgate_model::identity::IdentityId;
use flowgate_model::plan::Plan;
use flowgate_model::usage::{UsageDelta, UsageRecord};

use crate::usage_ledger::evaluate;

/// In-memory `UsageLedger` fake. Does not model calendar-boundary resets;
/// tests that care about reset behavior construct a `UsageRecord` directly
/// and assert against `crate::usage_ledger::evaluate`.
#[derive(Default)]
pub struct InMemoryLedger {
    records: DashMap<IdentityId, UsageRecord>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, identity: IdentityId, record: UsageRecord) {
        self.records.insert(identity, record);
    }
}

#[async_trait]
impl UsageLedger for InMemoryLedger {
    async fn read(&self, identity: &IdentityId) -> Result<UsageRecord, LedgerError> {
        Ok(self.records.get(identity).map(|r| *r).unwrap_or_default())
    }

    async fn increment(
        &self,
        identity: &IdentityId,
        delta: UsageDelta,
    ) -> Result<UsageRecord, LedgerError> {
        let mut entry = self.records.entry(identity.clone()).or_default();
        entry.operations_today += delta.operations;
        entry.operations_this_month += delta.operations;
        entry.bytes_today += delta.bytes;
        entry.bytes_this_month += delta.bytes;
        entry.pages_today += delta.pages;
        entry.pages_this_month += delta.pages;
        entry.ai_pages_today += delta.ai_pages;
        Ok(*entry)
    }

    async fn check(
        &self,
        identity: &IdentityId,
        plan: &Plan,
        delta: &UsageDelta,
    ) -> Result<QuotaCheck, LedgerError> {
        let record = self.records.get(identity).map(|r| *r).unwrap_or_default();
        Ok(evaluate(&record, plan, delta))
    }
}
