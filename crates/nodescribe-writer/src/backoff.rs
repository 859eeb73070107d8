// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff between conflicting update attempts.

use std::time::Duration;

use nodescribe_config::BackoffConfig;
use rand::Rng;

/// Retry policy for version conflicts.
///
/// Attempt `n` (1-based) that conflicts is followed by a sleep of
/// `min(initial_delay * multiplier^(n-1), max_delay)`, plus a random extra of
/// up to `jitter` times that amount.
///
/// A `multiplier` below 1 or not finite is treated as 1, and `jitter` is
/// clamped to `[0, 1]` (0 when not finite), so no policy value can panic.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&BackoffConfig::default())
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: sanitize_multiplier(config.multiplier),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: sanitize_jitter(config.jitter),
        }
    }
}

/// Growth factor actually used: finite and at least 1.
fn sanitize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier >= 1.0 {
        multiplier
    } else {
        1.0
    }
}

/// Jitter fraction actually used: finite and within `[0, 1]`.
fn sanitize_jitter(jitter: f64) -> f64 {
    if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl BackoffPolicy {
    /// A policy that retries up to `max_attempts` times without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Deterministic delay after the `attempt`-th conflict, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = sanitize_multiplier(self.multiplier);
        let scaled = self.initial_delay.as_secs_f64() * multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }

    /// Delay after the `attempt`-th conflict, including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = sanitize_jitter(self.jitter);
        if base.is_zero() || jitter == 0.0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..jitter);
        base + base.mul_f64(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: 4,
            initial_delay: Duration::from_millis(10),
            multiplier: 5.0,
            max_delay: Duration::from_millis(1000),
            jitter: 0.0,
        }
    }

    #[test]
    fn delays_grow_geometrically_until_capped() {
        let p = policy();
        assert_eq!(p.base_delay(1), Duration::from_millis(10));
        assert_eq!(p.base_delay(2), Duration::from_millis(50));
        assert_eq!(p.base_delay(3), Duration::from_millis(250));
        assert_eq!(p.base_delay(4), Duration::from_millis(1000));
        assert_eq!(p.base_delay(40), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let p = BackoffPolicy {
            jitter: 0.5,
            ..policy()
        };
        for _ in 0..100 {
            let d = p.delay(2);
            assert!(d >= Duration::from_millis(50), "got {d:?}");
            assert!(d <= Duration::from_millis(75), "got {d:?}");
        }
    }

    #[test]
    fn immediate_policy_never_sleeps() {
        let p = BackoffPolicy::immediate(3);
        assert_eq!(p.delay(1), Duration::ZERO);
        assert_eq!(p.delay(3), Duration::ZERO);
        assert!(p.allows_retry_after(2));
        assert!(!p.allows_retry_after(3));
    }

    #[test]
    fn from_config_matches_defaults() {
        let p = BackoffPolicy::default();
        assert_eq!(p.max_attempts, 4);
        assert_eq!(p.initial_delay, Duration::from_millis(10));
        assert_eq!(p.multiplier, 5.0);
        assert_eq!(p.max_delay, Duration::from_secs(1));
        assert_eq!(p.jitter, 0.1);
    }

    #[test]
    fn negative_multiplier_from_config_does_not_panic() {
        let config = nodescribe_config::load_config_from_str("[backoff]\nmultiplier = -2.0\n")
            .expect("unvalidated load accepts the value");
        let p = BackoffPolicy::from(&config.backoff);
        assert_eq!(p.multiplier, 1.0);
        assert_eq!(p.base_delay(2), Duration::from_millis(10));
        let d = p.delay(2);
        assert!(d >= Duration::from_millis(10), "got {d:?}");
        assert!(d <= Duration::from_millis(11), "got {d:?}");
    }

    #[test]
    fn invalid_multiplier_on_public_fields_is_treated_as_one() {
        for multiplier in [-2.0, 0.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let p = BackoffPolicy {
                multiplier,
                ..policy()
            };
            assert_eq!(p.base_delay(1), Duration::from_millis(10), "{multiplier}");
            assert_eq!(p.base_delay(3), Duration::from_millis(10), "{multiplier}");
        }
    }

    #[test]
    fn non_finite_jitter_is_ignored() {
        for jitter in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.5] {
            let p = BackoffPolicy {
                jitter,
                ..policy()
            };
            assert_eq!(p.delay(1), Duration::from_millis(10), "{jitter}");
        }
    }

    #[test]
    fn oversized_jitter_is_capped_at_one() {
        let p = BackoffPolicy {
            jitter: 7.0,
            ..policy()
        };
        for _ in 0..100 {
            let d = p.delay(1);
            assert!(d >= Duration::from_millis(10), "got {d:?}");
            assert!(d <= Duration::from_millis(20), "got {d:?}");
        }
        let config = BackoffConfig {
            jitter: f64::NAN,
            ..BackoffConfig::default()
        };
        assert_eq!(BackoffPolicy::from(&config).jitter, 0.0);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let config = BackoffConfig {
            max_attempts: 0,
            ..BackoffConfig::default()
        };
        assert_eq!(BackoffPolicy::from(&config).max_attempts, 1);
    }
}
