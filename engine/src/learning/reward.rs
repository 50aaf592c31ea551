//! Reward function
//!
//! Scores a completed attempt into a bounded scalar used by the analyzer
//! and strategy rankings. Pure and deterministic: identical inputs always
//! produce the identical reward.

use super::attempt::Outcome;

/// Bonus for a success that completed in under `SPEED_THRESHOLD_SECS`
const SPEED_BONUS: f64 = 0.2;

/// Bonus for a success that went undetected
const STEALTH_BONUS: f64 = 0.3;

/// Penalty for code over `COMPLEXITY_THRESHOLD_LINES` lines
const COMPLEXITY_PENALTY: f64 = 0.1;

const SPEED_THRESHOLD_SECS: f64 = 5.0;
const COMPLEXITY_THRESHOLD_LINES: usize = 100;

/// Inclusive reward bounds
pub const REWARD_MIN: f64 = -1.0;
pub const REWARD_MAX: f64 = 1.5;

/// Base reward for an outcome
fn base_reward(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Success => 1.0,
        Outcome::PartialSuccess => 0.5,
        Outcome::Failure => -0.5,
        Outcome::Timeout => -0.3,
        // Worst outcome: the attempt was noticed
        Outcome::Detected => -1.0,
        Outcome::Error => -0.2,
    }
}

/// Calculate the reward for an exploit attempt.
///
/// Speed and stealth bonuses apply only to successes; the complexity
/// penalty applies to every outcome. The result is clamped to
/// [`REWARD_MIN`, `REWARD_MAX`].
pub fn reward(outcome: Outcome, execution_time: f64, code_length: usize, detected: bool) -> f64 {
    let mut reward = base_reward(outcome);

    if outcome == Outcome::Success && execution_time < SPEED_THRESHOLD_SECS {
        reward += SPEED_BONUS;
    }

    if outcome == Outcome::Success && !detected {
        reward += STEALTH_BONUS;
    }

    if code_length > COMPLEXITY_THRESHOLD_LINES {
        reward -= COMPLEXITY_PENALTY;
    }

    reward.clamp(REWARD_MIN, REWARD_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fast_stealthy_success_hits_ceiling() {
        // 1.0 base + 0.2 speed + 0.3 stealth
        assert_eq!(reward(Outcome::Success, 2.0, 10, false), 1.5);
    }

    #[test]
    fn test_detected_is_floored() {
        // -1.0 base, no further penalty below the floor
        assert_eq!(reward(Outcome::Detected, 1.0, 10, true), -1.0);
    }

    #[test]
    fn test_failure_with_complex_code() {
        // -0.5 base - 0.1 complexity
        assert_eq!(reward(Outcome::Failure, 2.0, 150, false), -0.6);
    }

    #[test]
    fn test_slow_success_loses_speed_bonus() {
        // 1.0 base + 0.3 stealth, no speed bonus at 5.0s
        assert_eq!(reward(Outcome::Success, 5.0, 10, false), 1.3);
    }

    #[test]
    fn test_detected_success_loses_stealth_bonus() {
        // 1.0 base + 0.2 speed
        assert_eq!(reward(Outcome::Success, 2.0, 10, true), 1.2);
    }

    #[test]
    fn test_speed_bonus_does_not_apply_to_partial_success() {
        assert_eq!(reward(Outcome::PartialSuccess, 1.0, 10, false), 0.5);
    }

    #[test]
    fn test_complexity_penalty_applies_at_boundary() {
        // Exactly 100 lines is not "over"
        assert_eq!(reward(Outcome::Timeout, 1.0, 100, false), -0.3);
        assert!((reward(Outcome::Timeout, 1.0, 101, false) - (-0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_determinism() {
        let a = reward(Outcome::Error, 3.7, 42, true);
        let b = reward(Outcome::Error, 3.7, 42, true);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn reward_is_always_in_bounds(
            outcome_idx in 0usize..6,
            execution_time in 0.0f64..10_000.0,
            code_length in 0usize..100_000,
            detected in proptest::bool::ANY,
        ) {
            let outcome = [
                Outcome::Success,
                Outcome::PartialSuccess,
                Outcome::Failure,
                Outcome::Timeout,
                Outcome::Detected,
                Outcome::Error,
            ][outcome_idx];

            let r = reward(outcome, execution_time, code_length, detected);
            prop_assert!((REWARD_MIN..=REWARD_MAX).contains(&r));
        }
    }
}
