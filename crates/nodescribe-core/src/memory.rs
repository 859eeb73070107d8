// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process [`ObjectStore`] with real optimistic-concurrency semantics.
//!
//! Every write assigns a fresh resource version. Patches carrying a
//! precondition are rejected with [`StoreError::Conflict`] once the object has
//! moved on, exactly like a versioned remote store would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::StoreError;
use crate::patch::{create_json_patch, create_merge_patch};
use crate::traits::store::ObjectStore;
use crate::types::{Object, Patch, PatchKind};

/// Versioned in-memory object store.
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Object>>,
    next_version: AtomicU64,
    patch_kind: PatchKind,
}

impl MemoryStore {
    /// Creates an empty store that speaks merge patches.
    pub fn new() -> Self {
        Self::with_patch_kind(PatchKind::Merge)
    }

    /// Creates an empty store whose [`compute_patch`](ObjectStore::compute_patch)
    /// produces `kind` patches.
    pub fn with_patch_kind(patch_kind: PatchKind) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_version: AtomicU64::new(1),
            patch_kind,
        }
    }

    fn bump(&self) -> String {
        self.next_version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    /// Stores `object` under its name, replacing any previous version.
    /// Returns the assigned resource version.
    pub async fn insert(&self, mut object: Object) -> String {
        let version = self.bump();
        object.metadata.resource_version = version.clone();
        self.objects
            .write()
            .await
            .insert(object.metadata.name.clone(), object);
        version
    }

    /// Returns a copy of the stored object, if present.
    pub async fn get_object(&self, key: &str) -> Option<Object> {
        self.objects.read().await.get(key).cloned()
    }

    /// Names of all stored objects, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Mutates the stored object in place, bypassing any precondition, and
    /// bumps its resource version. Models a write by some other client.
    pub async fn modify<F>(&self, key: &str, f: F) -> Result<Object, StoreError>
    where
        F: FnOnce(&mut Object),
    {
        let mut objects = self.objects.write().await;
        let object = objects.get_mut(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        f(object);
        object.metadata.name = key.to_string();
        object.metadata.resource_version = self.bump();
        Ok(object.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(err: impl std::fmt::Display) -> StoreError {
    StoreError::Invalid {
        message: err.to_string(),
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Object, StoreError> {
        self.get_object(key).await.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    fn compute_patch(&self, before: &Value, after: &Value) -> Result<Patch, StoreError> {
        Ok(match self.patch_kind {
            PatchKind::Merge => Patch::merge(create_merge_patch(before, after)),
            PatchKind::Json => Patch::json(create_json_patch(before, after))?,
        })
    }

    async fn apply_patch(&self, key: &str, patch: &Patch) -> Result<Object, StoreError> {
        let mut objects = self.objects.write().await;
        let current = objects.get(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;

        if let Some(expected) = &patch.base_version {
            if expected != current.resource_version() {
                return Err(StoreError::Conflict {
                    key: key.to_string(),
                    expected: expected.clone(),
                    actual: current.resource_version().to_string(),
                });
            }
        }

        let mut document = serde_json::to_value(current).map_err(invalid)?;
        match patch.kind {
            PatchKind::Merge => json_patch::merge(&mut document, &patch.document),
            PatchKind::Json => {
                let operations: json_patch::Patch =
                    serde_json::from_value(patch.document.clone()).map_err(invalid)?;
                json_patch::patch(&mut document, &operations.0).map_err(invalid)?;
            }
        }

        let mut updated: Object = serde_json::from_value(document).map_err(invalid)?;
        if updated.metadata.name != key {
            return Err(StoreError::Invalid {
                message: format!("patch may not rename `{key}`"),
            });
        }
        updated.metadata.resource_version = self.bump();
        trace!(
            key,
            resource_version = updated.resource_version(),
            "applied patch"
        );

        objects.insert(key.to_string(), updated.clone());
        Ok(updated)
    }
}
