// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutations: reusable functions applied to the latest object snapshot.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nodescribe_core::Object;

type ApplyFn = dyn Fn(&mut Object) + Send + Sync;

/// A named, pure transformation of an [`Object`].
///
/// The updater may invoke a mutation several times, once per attempt, each
/// time on a fresh clone of the most recent snapshot. It must therefore not
/// depend on anything but its input.
#[derive(Clone)]
pub struct Mutation {
    label: Cow<'static, str>,
    apply: Arc<ApplyFn>,
}

impl Mutation {
    pub fn new<F>(label: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&mut Object) + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            apply: Arc::new(f),
        }
    }

    /// Merges `annotations` into the object's annotations, overwriting existing keys.
    pub fn set_annotations(annotations: BTreeMap<String, String>) -> Self {
        let label = format!(
            "set-annotations[{}]",
            annotations.keys().cloned().collect::<Vec<_>>().join(",")
        );
        Self::new(label, move |object| {
            for (key, value) in &annotations {
                object
                    .metadata
                    .annotations
                    .insert(key.clone(), value.clone());
            }
        })
    }

    /// Merges `labels` into the object's labels, overwriting existing keys.
    pub fn set_labels(labels: BTreeMap<String, String>) -> Self {
        let label = format!(
            "set-labels[{}]",
            labels.keys().cloned().collect::<Vec<_>>().join(",")
        );
        Self::new(label, move |object| {
            for (key, value) in &labels {
                object.metadata.labels.insert(key.clone(), value.clone());
            }
        })
    }

    /// Removes the given annotation keys if present.
    pub fn remove_annotations(keys: Vec<String>) -> Self {
        let label = format!("remove-annotations[{}]", keys.join(","));
        Self::new(label, move |object| {
            for key in &keys {
                object.metadata.annotations.remove(key);
            }
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Applies the mutation to `object` in place.
    pub fn apply(&self, object: &mut Object) {
        (self.apply)(object)
    }
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Builds an owned string map from literal pairs.
pub(crate) fn annotations<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
