use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Named subscription tier. Declaration order is significant: `derive(Ord)`
/// gives us the total order `free < premium < pro < corporate` used for
/// "minimum-plan" feature gating, with no separate ranking table to keep in
/// sync.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum PlanName {
    Free,
    Premium,
    Pro,
    Corporate,
}

impl PlanName {
    pub fn all() -> &'static [Self] {
        &[
            PlanName::Free,
            PlanName::Premium,
            PlanName::Pro,
            PlanName::Corporate,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanName::Free => "free",
            PlanName::Premium => "premium",
            PlanName::Pro => "pro",
            PlanName::Corporate => "corporate",
        }
    }
}

impl fmt::Display for PlanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanName::Free),
            "premium" => Ok(PlanName::Premium),
            "pro" => Ok(PlanName::Pro),
            "corporate" => Ok(PlanName::Corporate),
            other => Err(ModelError::InvalidPlanName(other.to_string())),
        }
    }
}

/// Feature flags gated by plan. Pure data; gating logic lives in
/// `flowgate-core`'s admission pipeline so this crate stays free of policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlanFeatures {
    pub ai_ocr: bool,
    pub watermark: bool,
    pub office_conversion: bool,
}

/// Immutable catalog entry. One `Plan` per `PlanName`, loaded once at
/// startup and never mutated (the plan catalog is the
/// one legitimately in-process piece of "shared" state).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: PlanName,
    pub max_file_size_bytes: u64,
    pub max_concurrent: u32,
    pub max_ops_day: u64,
    pub max_ops_month: u64,
    pub max_pages_day: u64,
    pub max_pages_month: u64,
    pub rate_limit_per_min: u32,
    pub burst_allowance: u32,
    pub batch_fanout: usize,
    pub features: PlanFeatures,
}

impl Plan {
    /// `true` if this plan is at least as capable as `minimum`, per the
    /// free<premium<pro<corporate total order.
    pub fn meets_minimum(&self, minimum: PlanName) -> bool {
        self.name >= minimum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_name_total_order() {
        assert!(PlanName::Free < PlanName::Premium);
        assert!(PlanName::Premium < PlanName::Pro);
        assert!(PlanName::Pro < PlanName::Corporate);
    }

    #[test]
    fn plan_name_roundtrips_through_str() {
        for name in PlanName::all() {
            let parsed: PlanName = name.as_str().parse().unwrap();
            assert_eq!(parsed, *name);
        }
    }

    #[test]
    fn invalid_plan_name_is_rejected() {
        assert!("enterprise".parse::<PlanName>().is_err());
    }
}
