// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-way patch construction between object snapshots.

use serde_json::{Map, Value};

/// Computes the RFC 7386 merge patch that turns `before` into `after`.
///
/// Keys missing from `after` become `null`, nested objects are diffed
/// recursively, and any other changed value (including arrays) is replaced
/// wholesale. Unchanged subtrees are omitted, so the patch only names the
/// fields the mutation actually touched.
pub fn create_merge_patch(before: &Value, after: &Value) -> Value {
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => Value::Object(diff_maps(before, after)),
        _ => after.clone(),
    }
}

fn diff_maps(before: &Map<String, Value>, after: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();

    for (key, old) in before {
        match after.get(key) {
            None => {
                patch.insert(key.clone(), Value::Null);
            }
            Some(new) if new != old => {
                let value = match (old, new) {
                    (Value::Object(old), Value::Object(new)) => Value::Object(diff_maps(old, new)),
                    _ => new.clone(),
                };
                patch.insert(key.clone(), value);
            }
            Some(_) => {}
        }
    }

    for (key, new) in after {
        if !before.contains_key(key) {
            patch.insert(key.clone(), new.clone());
        }
    }

    patch
}

/// Computes the RFC 6902 operation list that turns `before` into `after`.
pub fn create_json_patch(before: &Value, after: &Value) -> json_patch::Patch {
    json_patch::diff(before, after)
}
