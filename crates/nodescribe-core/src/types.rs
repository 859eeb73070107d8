// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object and patch types shared by stores and the writer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::StoreError;

/// Identity and metadata of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Unique name; the key the writer addresses the object by.
    pub name: String,

    /// Opaque version token managed by the store. Changes on every write.
    #[serde(default)]
    pub resource_version: String,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A versioned object held by an external store.
///
/// Only `metadata` is interpreted by nodescribe. `spec` and `status` are
/// carried through untouched so that patches never clobber them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub status: Value,
}

impl Object {
    /// Creates an empty object with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                ..ObjectMeta::default()
            },
            ..Object::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn resource_version(&self) -> &str {
        &self.metadata.resource_version
    }

    /// Looks up an annotation value.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    /// Looks up a label value.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    /// Builder-style helper to seed an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    /// Builder-style helper to seed a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }
}

/// Encoding of a [`Patch`] document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PatchKind {
    /// RFC 7386 JSON merge patch.
    #[default]
    Merge,
    /// RFC 6902 JSON patch (list of operations).
    Json,
}

/// Difference between two snapshots of one object, ready to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub kind: PatchKind,

    /// Resource version of the snapshot the patch was computed from. When set,
    /// the store must reject the patch if the object has moved on.
    #[serde(default)]
    pub base_version: Option<String>,

    pub document: Value,
}

impl Patch {
    /// Wraps an RFC 7386 merge patch document.
    pub fn merge(document: Value) -> Self {
        Self {
            kind: PatchKind::Merge,
            base_version: None,
            document,
        }
    }

    /// Encodes an RFC 6902 operation list.
    pub fn json(operations: json_patch::Patch) -> Result<Self, StoreError> {
        let document = serde_json::to_value(&operations).map_err(|e| StoreError::Invalid {
            message: format!("failed to encode json patch: {e}"),
        })?;
        Ok(Self {
            kind: PatchKind::Json,
            base_version: None,
            document,
        })
    }

    /// Requires the object to still be at `version` when the patch is applied.
    pub fn with_precondition(mut self, version: impl Into<String>) -> Self {
        self.base_version = Some(version.into());
        self
    }

    /// A patch that changes nothing.
    pub fn is_empty(&self) -> bool {
        match (&self.kind, &self.document) {
            (PatchKind::Merge, Value::Object(map)) => map.is_empty(),
            (PatchKind::Json, Value::Array(ops)) => ops.is_empty(),
            _ => false,
        }
    }
}

/// Lifecycle state recorded in the [`STATE`](crate::annotations::STATE) annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum NodeState {
    Done,
    Working,
    Unreconcilable,
    Degraded,
}
