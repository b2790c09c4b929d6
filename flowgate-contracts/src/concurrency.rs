use async_trait::async_trait;
use flowgate_model::identity::IdentityId;
use thiserror::Error;

/// Holds one in-flight concurrency slot for an identity. Callers release it
/// explicitly (there is no `AsyncDrop` in stable Rust); admission releases
/// it immediately on any later refusal in the same pipeline run, and the
/// usage tracker releases it on job terminal state. A 5-minute backend
/// TTL is the safety net if a process crashes holding one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcurrencyPermit {
    pub identity: IdentityId,
}

/// Per-identity concurrency gate. `acquire` must be atomic: if two
/// callers race for the last slot, exactly one succeeds.
#[async_trait]
pub trait ConcurrencyGate: Send + Sync {
    async fn acquire(
        &self,
        identity: &IdentityId,
        max_concurrent: u32,
    ) -> Result<ConcurrencyPermit, ConcurrencyError>;

    async fn release(&self, permit: ConcurrencyPermit) -> Result<(), ConcurrencyError>;

    /// Current in-flight count, for diagnostics and tests.
    async fn current(&self, identity: &IdentityId) -> Result<u32, ConcurrencyError>;
}

#[derive(Error, Debug)]
pub enum ConcurrencyError {
    #[error("concurrency limit exceeded")]
    Exceeded,

    #[error("concurrency gate backend unavailable: {0}")]
    Backend(#[source] anyhow::Error),
}
