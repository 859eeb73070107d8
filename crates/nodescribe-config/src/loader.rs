// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./nodescribe.toml` > `~/.config/nodescribe/nodescribe.toml` >
//! `/etc/nodescribe/nodescribe.toml` with environment variable overrides via `NODESCRIBE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::NodescribeConfig;

pub(crate) const LOCAL_CONFIG: &str = "nodescribe.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/nodescribe/nodescribe.toml";

/// Path of the per-user config file, if a config directory is known.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nodescribe/nodescribe.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/nodescribe/nodescribe.toml` (system-wide)
/// 3. `~/.config/nodescribe/nodescribe.toml` (user XDG config)
/// 4. `./nodescribe.toml` (local directory)
/// 5. `NODESCRIBE_*` environment variables
pub fn load_config() -> Result<NodescribeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<NodescribeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NodescribeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NodescribeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NodescribeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(NodescribeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `NODESCRIBE_BACKOFF_MAX_ATTEMPTS` must map to
/// `backoff.max_attempts`, not `backoff.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("NODESCRIBE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ["writer", "backoff", "logging"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
