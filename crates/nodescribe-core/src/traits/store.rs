// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object store trait for optimistically-versioned backends.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::patch::create_merge_patch;
use crate::types::{Object, Patch};

/// A remote store holding versioned objects.
///
/// Reads may be served from a cache and can be stale. Writes go through
/// [`apply_patch`](ObjectStore::apply_patch), which must fail with
/// [`StoreError::Conflict`] when the patch precondition no longer matches the
/// object's resource version.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetches the current snapshot of the object named `key`.
    async fn get(&self, key: &str) -> Result<Object, StoreError>;

    /// Computes the patch that turns the `before` snapshot into `after`.
    ///
    /// Defaults to an RFC 7386 merge patch. Stores with a different wire
    /// encoding override this.
    fn compute_patch(&self, before: &Value, after: &Value) -> Result<Patch, StoreError> {
        Ok(Patch::merge(create_merge_patch(before, after)))
    }

    /// Applies `patch` to the object named `key` and returns the stored result.
    async fn apply_patch(&self, key: &str, patch: &Patch) -> Result<Object, StoreError>;
}
