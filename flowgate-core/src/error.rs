use std::time::Duration;

use chrono::{DateTime, Utc};
use flowgate_contracts::concurrency::ConcurrencyError;
use flowgate_contracts::queue::QueueError;
use flowgate_contracts::rate_limiter::RateLimitError;
use flowgate_contracts::usage_ledger::LedgerError;
use flowgate_model::usage::QuotaDimension;
use thiserror::Error;

/// Every way the admission pipeline can refuse or fail a request. Each
/// variant maps to exactly one HTTP status in the server crate's `AppError`.
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("system under load, retry after {retry_after:?}")]
    InternalOverload { retry_after: Duration },

    #[error("payload of {size} bytes exceeds the absolute maximum of {max} bytes")]
    AbsoluteSizeExceeded { size: u64, max: u64 },

    #[error("payload of {size} bytes exceeds the {plan} plan maximum of {max} bytes")]
    PlanSizeExceeded {
        size: u64,
        max: u64,
        plan: flowgate_model::plan::PlanName,
    },

    #[error("the {plan} plan does not include this operation")]
    FeatureNotAllowed {
        plan: flowgate_model::plan::PlanName,
    },

    #[error("{dimension} quota exceeded: {current}/{limit}")]
    QuotaExceeded {
        dimension: QuotaDimension,
        current: u64,
        limit: u64,
        reset_time: DateTime<Utc>,
    },

    #[error("concurrency limit exceeded")]
    ConcurrencyExceeded,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("identity could not be established")]
    Unauthenticated,

    #[error("backend transient error: {0}")]
    BackendTransient(#[source] anyhow::Error),
}

impl AdmissionError {
    /// Stable machine-readable slug, shared between the HTTP refusal
    /// payload's `code` field and the per-item failure kind reported from a
    /// batch submission.
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::InternalOverload { .. } => "internal_overload",
            AdmissionError::AbsoluteSizeExceeded { .. } => "absolute_size_exceeded",
            AdmissionError::PlanSizeExceeded { .. } => "plan_size_exceeded",
            AdmissionError::FeatureNotAllowed { .. } => "feature_not_allowed",
            AdmissionError::QuotaExceeded { .. } => "quota_exceeded",
            AdmissionError::ConcurrencyExceeded => "concurrency_exceeded",
            AdmissionError::RateLimited { .. } => "rate_limited",
            AdmissionError::Unauthenticated => "unauthenticated",
            AdmissionError::BackendTransient(_) => "backend_transient",
        }
    }
}

impl From<RateLimitError> for AdmissionError {
    fn from(e: RateLimitError) -> Self {
        match e {
            RateLimitError::Exceeded { retry_after, .. } => {
                AdmissionError::RateLimited { retry_after }
            }
            RateLimitError::Backend(err) => AdmissionError::BackendTransient(err),
        }
    }
}

impl From<ConcurrencyError> for AdmissionError {
    fn from(e: ConcurrencyError) -> Self {
        match e {
            ConcurrencyError::Exceeded => AdmissionError::ConcurrencyExceeded,
            ConcurrencyError::Backend(err) => AdmissionError::BackendTransient(err),
        }
    }
}

impl From<LedgerError> for AdmissionError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::BackendTransient(err) => AdmissionError::BackendTransient(err),
        }
    }
}

impl From<QueueError> for AdmissionError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::BackendUnavailable(err) | QueueError::Backend(err) => {
                AdmissionError::BackendTransient(err)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AdmissionError>;
