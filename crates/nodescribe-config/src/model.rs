// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for nodescribe.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level nodescribe configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodescribeConfig {
    /// Request queue and caller-side settings.
    #[serde(default)]
    pub writer: WriterConfig,

    /// Retry policy for version conflicts.
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node writer queue configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Number of pending requests buffered before submitters block.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long a caller waits for its request to complete, in milliseconds.
    /// `0` waits indefinitely.
    #[serde(default)]
    pub response_timeout_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            response_timeout_ms: 0,
        }
    }
}

fn default_queue_capacity() -> usize {
    25
}

/// Exponential backoff applied between conflicting update attempts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    /// Total attempts, including the first, before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first conflict, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Factor applied to the delay after each further conflict.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on a single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random extra delay, as a fraction of the computed delay (0.0 - 1.0).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay_ms() -> u64 {
    10
}

fn default_multiplier() -> f64 {
    5.0
}

fn default_max_delay_ms() -> u64 {
    1000
}

fn default_jitter() -> f64 {
    0.1
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
