// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the nodescribe store interface and writer.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by an [`ObjectStore`](crate::ObjectStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object `{key}` not found")]
    NotFound { key: String },

    /// The object's resource version no longer matches the patch precondition.
    #[error("version conflict on `{key}`: patch based on {expected}, object is at {actual}")]
    Conflict {
        key: String,
        expected: String,
        actual: String,
    },

    /// The store could not be reached or refused service.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The store rejected the request as malformed.
    #[error("invalid request: {message}")]
    Invalid { message: String },
}

impl StoreError {
    /// Returns `true` for optimistic-concurrency conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Errors surfaced to callers of the node writer.
///
/// Every submitted request resolves to exactly one `Result<(), WriterError>`.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Fetching the current snapshot failed. Not retried.
    #[error("failed to read `{key}`: {source}")]
    Read {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The store rejected a patch because the object changed underneath it.
    /// Retried internally; only observed through [`WriterError::RetryExhausted`].
    #[error("conflict updating `{key}`: {source}")]
    Conflict {
        key: String,
        #[source]
        source: StoreError,
    },

    /// Every attempt allowed by the backoff policy hit a conflict.
    #[error("unable to update `{key}` after {attempts} attempts: {source}")]
    RetryExhausted {
        key: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// The before/after snapshot could not be encoded.
    #[error("failed to serialize `{key}`: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store could not compute a patch between the two snapshots.
    #[error("failed to create patch for `{key}`: {source}")]
    Diff {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The store rejected the patch for a reason other than a conflict.
    #[error("failed to patch `{key}`: {source}")]
    Patch {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The writer loop stopped before the request was processed.
    #[error("node writer is shut down")]
    Shutdown,

    /// The caller gave up waiting for the writer.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl WriterError {
    /// Short, stable name of the variant, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            WriterError::Read { .. } => "read",
            WriterError::Conflict { .. } => "conflict",
            WriterError::RetryExhausted { .. } => "retry_exhausted",
            WriterError::Serialization { .. } => "serialization",
            WriterError::Diff { .. } => "diff",
            WriterError::Patch { .. } => "patch",
            WriterError::Shutdown => "shutdown",
            WriterError::Timeout { .. } => "timeout",
        }
    }

    /// The object key the error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            WriterError::Read { key, .. }
            | WriterError::Conflict { key, .. }
            | WriterError::RetryExhausted { key, .. }
            | WriterError::Serialization { key, .. }
            | WriterError::Diff { key, .. }
            | WriterError::Patch { key, .. } => Some(key),
            WriterError::Shutdown | WriterError::Timeout { .. } => None,
        }
    }
}
