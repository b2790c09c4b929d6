use std::time::Duration;

use flowgate_model::plan::PlanName;

const MAX_WAIT_BOOST: i64 = 5;
const WAIT_BOOST_INTERVAL_SECS: i64 = 5 * 60;
const USAGE_PENALTY_THRESHOLD: u64 = 100;
const USAGE_PENALTY: i64 = 2;

fn base_score(plan: PlanName) -> i64 {
    match plan {
        PlanName::Free => 1,
        PlanName::Premium => 5,
        PlanName::Pro => 8,
        PlanName::Corporate => 10,
    }
}

/// Pure scoring function. `jobs_last_hour` is the identity's recent
/// job count, fed in by the caller rather than looked up here so this stays
/// a pure function with no backend dependency.
pub fn score(plan: PlanName, wait: Duration, retry_count: u32, jobs_last_hour: u64) -> u8 {
    let base = base_score(plan);
    let wait_boost = (wait.as_secs() as i64 / WAIT_BOOST_INTERVAL_SECS).min(MAX_WAIT_BOOST);
    let usage_penalty = if jobs_last_hour > USAGE_PENALTY_THRESHOLD {
        USAGE_PENALTY
    } else {
        0
    };
    let retry_bonus = USAGE_PENALTY * retry_count as i64;

    (base + wait_boost + retry_bonus - usage_penalty).clamp(1, 10) as u8
}

/// Whether a queued job should be promoted out of cadence. Promotion
/// never demotes and, per the immediate-promotion rule, bypasses the usage
/// penalty entirely: a promoted job's lane becomes `normal` regardless of
/// what the score formula would otherwise say.
pub fn should_promote_immediately(wait: Duration, current_score: u8) -> bool {
    const PROMOTE_WAIT_ANY: Duration = Duration::from_secs(30 * 60);
    const PROMOTE_WAIT_LOWPRIO: Duration = Duration::from_secs(15 * 60);
    const LOW_SCORE_THRESHOLD: u8 = 5;

    wait > PROMOTE_WAIT_ANY || (wait > PROMOTE_WAIT_LOWPRIO && current_score < LOW_SCORE_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_plan_base_score_is_one() {
        assert_eq!(score(PlanName::Free, Duration::ZERO, 0, 0), 1);
    }

    #[test]
    fn corporate_plan_caps_at_ten() {
        assert_eq!(
            score(PlanName::Corporate, Duration::from_secs(3600), 5, 0),
            10
        );
    }

    #[test]
    fn wait_boost_accumulates_every_five_minutes() {
        assert_eq!(score(PlanName::Free, Duration::from_secs(15 * 60), 0, 0), 4);
        assert_eq!(score(PlanName::Free, Duration::from_secs(30 * 60), 0, 0), 6);
    }

    #[test]
    fn usage_penalty_applies_above_hundred_jobs_last_hour() {
        assert_eq!(score(PlanName::Premium, Duration::ZERO, 0, 101), 3);
        assert_eq!(score(PlanName::Premium, Duration::ZERO, 0, 100), 5);
    }

    #[test]
    fn score_never_goes_below_one() {
        assert_eq!(score(PlanName::Free, Duration::ZERO, 0, 1_000), 1);
    }

    #[test]
    fn promotes_after_thirty_minutes_regardless_of_score() {
        assert!(should_promote_immediately(Duration::from_secs(31 * 60), 9));
    }

    #[test]
    fn promotes_after_fifteen_minutes_only_if_low_score() {
        assert!(should_promote_immediately(Duration::from_secs(16 * 60), 4));
        assert!(!should_promote_immediately(Duration::from_secs(16 * 60), 6));
    }
}
