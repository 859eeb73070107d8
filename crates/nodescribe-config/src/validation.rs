// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero queue capacity and a well-formed backoff curve.

use crate::diagnostic::ConfigError;
use crate::model::NodescribeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &NodescribeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.writer.queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "writer.queue_capacity must be at least 1".to_string(),
        });
    }

    let backoff = &config.backoff;

    if backoff.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "backoff.max_attempts must be at least 1".to_string(),
        });
    }

    if !backoff.multiplier.is_finite() || backoff.multiplier < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "backoff.multiplier must be a finite number >= 1.0, got {}",
                backoff.multiplier
            ),
        });
    }

    if backoff.max_delay_ms < backoff.initial_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "backoff.max_delay_ms ({}) must not be less than backoff.initial_delay_ms ({})",
                backoff.max_delay_ms, backoff.initial_delay_ms
            ),
        });
    }

    if !(0.0..=1.0).contains(&backoff.jitter) {
        errors.push(ConfigError::Validation {
            message: format!(
                "backoff.jitter must be between 0.0 and 1.0, got {}",
                backoff.jitter
            ),
        });
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
