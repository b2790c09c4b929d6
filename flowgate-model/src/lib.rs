//! Shared data model for the flowgate control plane.
//!
//! This crate only carries types: plans, identities, usage counters, jobs,
//! batches and the operation taxonomy they're all keyed on. Behavior lives in
//! `flowgate-contracts` (trait surfaces) and `flowgate-core` (implementations).

pub mod batch;
pub mod error;
pub mod identity;
pub mod job;
pub mod operation;
pub mod plan;
pub mod usage;

/// Frequently used types, re-exported for downstream crates.
pub mod prelude {
    pub use super::batch::{
        Batch, BatchId, BatchItemOutcome, BatchReceipt, BatchSummary,
    };
    pub use super::error::ModelError;
    pub use super::identity::{Identity, IdentityId};
    pub use super::job::{Job, JobId, JobState, Lane, PendingOperation};
    pub use super::operation::OperationKind;
    pub use super::plan::{Plan, PlanName};
    pub use super::usage::{QuotaDimension, UsageDelta, UsageRecord};
}
