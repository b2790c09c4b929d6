use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use flowgate_contracts::concurrency::{ConcurrencyError, ConcurrencyGate, ConcurrencyPermit};
use flowgate_model::identity::IdentityId;

/// In-memory `ConcurrencyGate` fake: one atomic counter per identity.
#[derive(Default)]
pub struct InMemoryConcurrencyGate {
    counters: DashMap<IdentityId, AtomicU32>,
}

impl InMemoryConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConcurrencyGate for InMemoryConcurrencyGate {
    async fn acquire(
        &self,
        identity: &IdentityId,
        max_concurrent: u32,
    ) -> Result<ConcurrencyPermit, ConcurrencyError> {
        let counter = self
            .counters
            .entry(identity.clone())
            .or_insert_with(|| AtomicU32::new(0));

        loop {
            let current = counter.load(Ordering::SeqCst);
            if current >= max_concurrent {
                return Err(ConcurrencyError::Exceeded);
            }
            if counter
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(ConcurrencyPermit {
                    identity: identity.clone(),
                });
            }
        }
    }

    async fn release(&self, permit: ConcurrencyPermit) -> Result<(), ConcurrencyError> {
        if let Some(counter) = self.counters.get(&permit.identity) {
            counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_sub(1))
            }).ok();
        }
        Ok(())
    }

    async fn current(&self, identity: &IdentityId) -> Result<u32, ConcurrencyError> {
        Ok(self
            .counters
            .get(identity)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0))
    }
}
