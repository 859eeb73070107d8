// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end writer tests.
//!
//! `TestHarness` seeds a [`FakeStore`], builds a [`NodeWriter`] over it and
//! spawns the [`WriterLoop`](nodescribe_writer::WriterLoop) under a
//! cancellation token, so tests only deal with the writer handle and the store.

use std::sync::Arc;
use std::time::Duration;

use nodescribe_config::NodescribeConfig;
use nodescribe_core::Object;
use nodescribe_writer::{BackoffPolicy, NodeWriter, WriterSettings};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fake_store::FakeStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    objects: Vec<Object>,
    settings: WriterSettings,
    store: Option<Arc<FakeStore>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
            settings: WriterSettings {
                backoff: BackoffPolicy::immediate(4),
                ..WriterSettings::from(&NodescribeConfig::default())
            },
            store: None,
        }
    }

    /// Seed an object into the store before the loop starts.
    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    /// Seed empty objects with the given names.
    pub fn with_objects<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.objects.extend(names.into_iter().map(Object::new));
        self
    }

    /// Use a pre-configured store instead of a fresh one.
    pub fn with_store(mut self, store: Arc<FakeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.settings.queue_capacity = capacity;
        self
    }

    /// Defaults to four attempts with no sleep between them.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.settings.backoff = backoff;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.settings.response_timeout = Some(timeout);
        self
    }

    /// Seed the store, create the writer and spawn its loop.
    pub async fn build(self) -> TestHarness {
        let store = self.store.unwrap_or_default();
        for object in self.objects {
            store.insert(object).await;
        }

        let (writer, writer_loop) = NodeWriter::new(store.clone(), &self.settings);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(writer_loop.run(cancel.clone()));

        TestHarness {
            store,
            writer,
            cancel,
            handle: Some(handle),
        }
    }
}

/// A running writer over a [`FakeStore`].
///
/// Dropping the harness cancels the loop without waiting for it.
pub struct TestHarness {
    /// The instrumented store the loop writes to.
    pub store: Arc<FakeStore>,
    /// A writer handle; clone it to submit from several tasks.
    pub writer: NodeWriter,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Current stored copy of `key`.
    ///
    /// # Panics
    ///
    /// Panics if the object does not exist.
    pub async fn object(&self, key: &str) -> Object {
        self.store
            .object(key)
            .await
            .unwrap_or_else(|| panic!("object `{key}` is not in the store"))
    }

    /// Token controlling the loop, for tests that cancel at a precise point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop and wait for it to finish draining.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.expect("writer loop panicked");
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use nodescribe_core::WriterError;
    use nodescribe_writer::Mutation;

    use super::*;

    #[tokio::test]
    async fn builds_seeded_running_writer() {
        let harness = TestHarness::builder()
            .with_objects(["a", "b"])
            .with_object(Object::new("c").with_label("role", "worker"))
            .build()
            .await;

        assert_eq!(harness.store.inner().keys().await, vec!["a", "b", "c"]);
        harness.writer.mark_working("c").await.unwrap();
        assert_eq!(harness.object("c").await.label("role"), Some("worker"));

        let writer = harness.writer.clone();
        harness.shutdown().await;
        let err = writer
            .submit("a", Mutation::new("noop", |_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, WriterError::Shutdown));
    }
}
