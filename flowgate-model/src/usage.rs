use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-identity mutable usage counters, mirrored 1:1 onto the
/// `usage:{identity}:day:*` / `usage:{identity}:month:*` Redis hashes
/// persisted per identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub operations_today: u64,
    pub operations_this_month: u64,
    pub bytes_today: u64,
    pub bytes_this_month: u64,
    pub pages_today: u64,
    pub pages_this_month: u64,
    pub ai_pages_today: u64,
    /// Next local midnight: when the `_today` counters roll to zero.
    pub daily_reset_at: Option<DateTime<Utc>>,
    /// First day of next month: when the `_this_month` counters roll to zero.
    pub monthly_reset_at: Option<DateTime<Utc>>,
}

/// Proposed (or actual, post-hoc) change to a `UsageRecord`. Used both as the
/// admission-time estimate and as the corrected delta applied
/// after job completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageDelta {
    pub operations: u64,
    pub bytes: u64,
    pub pages: u64,
    pub ai_pages: u64,
}

impl UsageDelta {
    pub fn new(operations: u64, bytes: u64, pages: u64, ai_pages: u64) -> Self {
        Self {
            operations,
            bytes,
            pages,
            ai_pages,
        }
    }
}

/// Which quota dimension tripped, for structured `QuotaExceeded` refusals.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum QuotaDimension {
    DailyOperations,
    MonthlyOperations,
    DailyBytes,
    MonthlyBytes,
    DailyPages,
    MonthlyPages,
}

impl QuotaDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaDimension::DailyOperations => "daily_operations",
            QuotaDimension::MonthlyOperations => "monthly_operations",
            QuotaDimension::DailyBytes => "daily_bytes",
            QuotaDimension::MonthlyBytes => "monthly_bytes",
            QuotaDimension::DailyPages => "daily_pages",
            QuotaDimension::MonthlyPages => "monthly_pages",
        }
    }
}

impl fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
