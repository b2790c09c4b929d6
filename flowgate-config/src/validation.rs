use std::fmt;

use flowgate_model::plan::PlanName;

use crate::models::Config;

/// Non-fatal configuration issues. Unlike `ConfigLoadError`, these never stop
/// startup; they're logged as warnings so an operator notices a suspicious
/// value without the process refusing to start over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    MissingPlan(PlanName),
    ProtectorLeaveNotGreaterThanEnter { enter: u32, leave: u32 },
    AbsoluteMaxBelowLargestPlan { absolute_max: u64, plan_max: u64 },
    ZeroLedgerRetries,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::MissingPlan(name) => {
                write!(f, "plan catalog has no entry for {name}")
            }
            ConfigWarning::ProtectorLeaveNotGreaterThanEnter { enter, leave } => write!(
                f,
                "protector_leave_samples ({leave}) should exceed protector_enter_samples ({enter}) to avoid flapping"
            ),
            ConfigWarning::AbsoluteMaxBelowLargestPlan {
                absolute_max,
                plan_max,
            } => write!(
                f,
                "absolute_max_bytes ({absolute_max}) is below the largest plan's max_file_size_bytes ({plan_max}); that plan's limit is unreachable"
            ),
            ConfigWarning::ZeroLedgerRetries => {
                write!(f, "ledger.retries is 0; any transient backend error will surface immediately")
            }
        }
    }
}

/// Runs every guard-rail check and returns the warnings found, in no
/// particular priority order. Never returns `Err`: a malformed `Config`
/// value can't be constructed, only a suspicious one.
pub fn validate(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    for name in [
        PlanName::Free,
        PlanName::Premium,
        PlanName::Pro,
        PlanName::Corporate,
    ] {
        if config.plan(name).is_none() {
            warnings.push(ConfigWarning::MissingPlan(name));
        }
    }

    if config.resource_guard.protector_leave_samples <= config.resource_guard.protector_enter_samples {
        warnings.push(ConfigWarning::ProtectorLeaveNotGreaterThanEnter {
            enter: config.resource_guard.protector_enter_samples,
            leave: config.resource_guard.protector_leave_samples,
        });
    }

    if let Some(largest) = config
        .plan_catalog
        .iter()
        .map(|p| p.max_file_size_bytes)
        .max()
    {
        if config.envelope.absolute_max_bytes < largest {
            warnings.push(ConfigWarning::AbsoluteMaxBelowLargestPlan {
                absolute_max: config.envelope.absolute_max_bytes,
                plan_max: largest,
            });
        }
    }

    if config.ledger.retries == 0 {
        warnings.push(ConfigWarning::ZeroLedgerRetries);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_warnings() {
        assert!(validate(&Config::default()).is_empty());
    }

    #[test]
    fn catches_inverted_protector_samples() {
        let mut config = Config::default();
        config.resource_guard.protector_enter_samples = 5;
        config.resource_guard.protector_leave_samples = 3;
        assert!(validate(&config)
            .contains(&ConfigWarning::ProtectorLeaveNotGreaterThanEnter { enter: 5, leave: 3 }));
    }

    #[test]
    fn catches_unreachable_plan_limit() {
        let mut config = Config::default();
        config.envelope.absolute_max_bytes = 1024;
        let warnings = validate(&config);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::AbsoluteMaxBelowLargestPlan { .. })));
    }
}
