// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conflict-aware read-modify-patch against an [`ObjectStore`].
//!
//! Each attempt re-reads the object, applies the mutation to a clone of that
//! snapshot and diffs the two, so a retry never resubmits a patch computed
//! from a base that has since changed.

use nodescribe_core::{Object, ObjectStore, WriterError};
use tracing::{debug, trace, warn};

use crate::backoff::BackoffPolicy;
use crate::mutation::Mutation;
use crate::recording;

/// Applies `mutation` to the object named `key`, retrying on version conflicts.
///
/// Read, serialization, diff and non-conflict patch failures are returned
/// immediately. Conflicts are retried until `backoff.max_attempts` attempts
/// have been made, after which [`WriterError::RetryExhausted`] is returned.
pub async fn update_with_retry(
    store: &dyn ObjectStore,
    key: &str,
    backoff: &BackoffPolicy,
    mutation: &Mutation,
) -> Result<Object, WriterError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match try_update(store, key, mutation).await {
            Ok(object) => return Ok(object),
            Err(WriterError::Conflict { key, source }) => {
                recording::record_conflict();
                if !backoff.allows_retry_after(attempt) {
                    warn!(
                        key = key.as_str(),
                        attempts = attempt,
                        "giving up after repeated conflicts"
                    );
                    return Err(WriterError::RetryExhausted {
                        key,
                        attempts: attempt,
                        source,
                    });
                }
                let delay = backoff.delay(attempt);
                debug!(
                    key = key.as_str(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %source,
                    "conflict, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// One read-apply-diff-submit pass.
async fn try_update(
    store: &dyn ObjectStore,
    key: &str,
    mutation: &Mutation,
) -> Result<Object, WriterError> {
    let current = store.get(key).await.map_err(|source| WriterError::Read {
        key: key.to_string(),
        source,
    })?;

    let serialization = |source| WriterError::Serialization {
        key: key.to_string(),
        source,
    };
    let before = serde_json::to_value(&current).map_err(serialization)?;

    let mut updated = current.clone();
    mutation.apply(&mut updated);
    let after = serde_json::to_value(&updated).map_err(serialization)?;

    let patch = store
        .compute_patch(&before, &after)
        .map_err(|source| WriterError::Diff {
            key: key.to_string(),
            source,
        })?;

    if patch.is_empty() {
        trace!(key, mutation = mutation.label(), "mutation is a no-op, skipping patch");
        return Ok(current);
    }

    let patch = patch.with_precondition(current.resource_version());
    trace!(key, mutation = mutation.label(), patch = %patch.document, "submitting patch");

    store.apply_patch(key, &patch).await.map_err(|source| {
        if source.is_conflict() {
            WriterError::Conflict {
                key: key.to_string(),
                source,
            }
        } else {
            WriterError::Patch {
                key: key.to_string(),
                source,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use nodescribe_core::{MemoryStore, StoreError};

    use super::*;
    use crate::mutation::annotations;

    #[tokio::test]
    async fn applies_mutation_to_stored_object() {
        let store = MemoryStore::new();
        store.insert(Object::new("node-1").with_label("zone", "a")).await;

        let mutation = Mutation::set_annotations(annotations([("state", "Working")]));
        let updated = update_with_retry(&store, "node-1", &BackoffPolicy::immediate(3), &mutation)
            .await
            .unwrap();

        assert_eq!(updated.annotation("state"), Some("Working"));
        assert_eq!(updated.label("zone"), Some("a"));
        assert_eq!(store.get_object("node-1").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn missing_object_is_a_read_error() {
        let store = MemoryStore::new();
        let mutation = Mutation::set_annotations(annotations([("a", "b")]));
        let err = update_with_retry(&store, "ghost", &BackoffPolicy::immediate(3), &mutation)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WriterError::Read {
                source: StoreError::NotFound { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_op_mutation_does_not_write() {
        let store = MemoryStore::new();
        let version = store
            .insert(Object::new("node-1").with_annotation("a", "b"))
            .await;

        let mutation = Mutation::set_annotations(annotations([("a", "b")]));
        let result = update_with_retry(&store, "node-1", &BackoffPolicy::immediate(1), &mutation)
            .await
            .unwrap();
        assert_eq!(result.resource_version(), version);
    }
}
