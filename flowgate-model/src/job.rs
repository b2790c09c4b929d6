use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::BatchId;
use crate::error::{ModelError, Result};
use crate::identity::IdentityId;
use crate::operation::OperationKind;
use crate::plan::Plan;
use crate::usage::UsageDelta;

/// Unique identifier for a scheduling unit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority-keyed FIFO channel. Five lanes suffice: within a lane,
/// FIFO; across lanes, strictly higher lane drains first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Lane {
    Critical = 4,
    High = 3,
    Normal = 2,
    Low = 1,
    Default = 0,
}

impl Lane {
    /// Maps a priority score in [1,10] to its lane.
    pub fn from_score(score: u8) -> Self {
        match score {
            9..=10 => Lane::Critical,
            7..=8 => Lane::High,
            4..=6 => Lane::Normal,
            2..=3 => Lane::Low,
            _ => Lane::Default,
        }
    }

    pub fn all_descending() -> &'static [Self] {
        &[
            Lane::Critical,
            Lane::High,
            Lane::Normal,
            Lane::Low,
            Lane::Default,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Critical => "critical",
            Lane::High => "high",
            Lane::Normal => "normal",
            Lane::Low => "low",
            Lane::Default => "default",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Lane {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Lane::Critical),
            "high" => Ok(Lane::High),
            "normal" => Ok(Lane::Normal),
            "low" => Ok(Lane::Low),
            "default" => Ok(Lane::Default),
            other => Err(ModelError::InvalidLane(other.to_string())),
        }
    }
}

/// Lifecycle state of a `Job`. Terminal states {Succeeded, Failed,
/// Cancelled} release the owning identity's concurrency slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

/// A scheduling unit. Owning identity and plan snapshot are fixed at
/// creation: a `Job` never changes them afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub identity: IdentityId,
    pub plan: Plan,
    pub kind: OperationKind,
    pub blob_id: String,
    pub batch_id: Option<BatchId>,
    pub enqueued_at: DateTime<Utc>,
    pub priority_score: u8,
    pub retry_count: u32,
    pub state: JobState,
}

impl Job {
    pub fn new(
        identity: IdentityId,
        plan: Plan,
        kind: OperationKind,
        blob_id: impl Into<String>,
    ) -> Self {
        Self::new_with_id(JobId::new(), identity, plan, kind, blob_id)
    }

    /// Same as `new`, but with a caller-supplied id. Used when the id must
    /// already exist before the job itself does, e.g. admission stages a
    /// `PendingOperation` under a job id before the job is enqueued, and the
    /// two records need to agree on that id.
    pub fn new_with_id(
        id: JobId,
        identity: IdentityId,
        plan: Plan,
        kind: OperationKind,
        blob_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            identity,
            plan,
            kind,
            blob_id: blob_id.into(),
            batch_id: None,
            enqueued_at: Utc::now(),
            priority_score: 1,
            retry_count: 0,
            state: JobState::Queued,
        }
    }

    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn lane(&self) -> Lane {
        Lane::from_score(self.priority_score)
    }

    pub fn wait(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.enqueued_at
    }
}

/// Admission-staged record attached to the request context and consumed by
/// the usage tracker once the job reaches a terminal state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingOperation {
    pub job_id: JobId,
    pub identity: IdentityId,
    pub kind: OperationKind,
    pub plan: Plan,
    pub estimated_delta: UsageDelta,
    pub admitted_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(
        job_id: JobId,
        identity: IdentityId,
        kind: OperationKind,
        plan: Plan,
        estimated_delta: UsageDelta,
    ) -> Self {
        Self {
            job_id,
            identity,
            kind,
            plan,
            estimated_delta,
            admitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_from_score_matches_table() {
        assert_eq!(Lane::from_score(10), Lane::Critical);
        assert_eq!(Lane::from_score(9), Lane::Critical);
        assert_eq!(Lane::from_score(8), Lane::High);
        assert_eq!(Lane::from_score(7), Lane::High);
        assert_eq!(Lane::from_score(6), Lane::Normal);
        assert_eq!(Lane::from_score(4), Lane::Normal);
        assert_eq!(Lane::from_score(3), Lane::Low);
        assert_eq!(Lane::from_score(2), Lane::Low);
        assert_eq!(Lane::from_score(1), Lane::Default);
    }

    #[test]
    fn lane_ordering_is_strictly_descending() {
        let lanes = Lane::all_descending();
        for pair in lanes.windows(2) {
            assert!((pair[0] as u8) > (pair[1] as u8));
        }
    }

    #[test]
    fn terminal_states_are_exactly_three() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }
}
