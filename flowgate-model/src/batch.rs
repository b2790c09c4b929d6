use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::JobId;

/// Unique identifier for a batch correlation handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of fanning out one batch item through `enqueue`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BatchItemOutcome {
    Queued { job_id: JobId },
    Failed { error_kind: String, message: String },
}

impl BatchItemOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, BatchItemOutcome::Queued { .. })
    }
}

/// `{total, queued, failed}` aggregate returned alongside per-item outcomes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub queued: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchItemOutcome]) -> Self {
        let total = outcomes.len();
        let queued = outcomes.iter().filter(|o| o.is_queued()).count();
        Self {
            total,
            queued,
            failed: total - queued,
        }
    }
}

/// A set of jobs sharing a batch id, created within one admission decision.
/// Not itself a scheduling unit: it is a correlation handle only. There is
/// deliberately no owned `Vec<Job>` field here; a `Batch` is reconstructed
/// by querying jobs whose `batch_id` equals it, never by an owning pointer
/// from batch to job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub identity: crate::identity::IdentityId,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(identity: crate::identity::IdentityId) -> Self {
        Self {
            id: BatchId::new(),
            identity,
            created_at: Utc::now(),
        }
    }
}

/// Receipt returned by `enqueue_batch`: per-item outcomes plus the
/// aggregate summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub batch_id: BatchId,
    pub outcomes: Vec<BatchItemOutcome>,
    pub summary: BatchSummary,
}

impl BatchReceipt {
    pub fn new(batch_id: BatchId, outcomes: Vec<BatchItemOutcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self {
            batch_id,
            outcomes,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_accounts_for_every_outcome() {
        let outcomes = vec![
            BatchItemOutcome::Queued { job_id: JobId::new() },
            BatchItemOutcome::Queued { job_id: JobId::new() },
            BatchItemOutcome::Failed {
                error_kind: "invalid_operation_kind".into(),
                message: "unknown kind".into(),
            },
        ];
        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.queued, 2);
        assert_eq!(summary.failed, 1);
    }
}
