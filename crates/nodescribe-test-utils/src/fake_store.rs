// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instrumented object store for deterministic writer tests.
//!
//! `FakeStore` delegates to a [`MemoryStore`], so versions and preconditions
//! behave like a real optimistic-concurrency store. On top of that it can
//! provoke genuine conflicts by writing to the object out of band right before
//! a patch is checked, fail reads, diffs or patches outright, slow patches
//! down, and record everything it was asked to do.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use nodescribe_core::{MemoryStore, Object, ObjectStore, Patch, StoreError};
use serde_json::Value;
use tracing::debug;

type ExternalWrite = Arc<dyn Fn(&mut Object) + Send + Sync>;

#[derive(Default)]
struct Faults {
    conflicts_remaining: usize,
    always_conflict: bool,
    external_write: Option<ExternalWrite>,
    read_failure: Option<String>,
    diff_failure: Option<String>,
    patch_failure: Option<String>,
    patch_delay: Duration,
}

/// A [`MemoryStore`] wrapper with fault injection and call accounting.
pub struct FakeStore {
    inner: MemoryStore,
    faults: Mutex<Faults>,
    patches: Mutex<Vec<(String, Patch)>>,
    get_calls: AtomicUsize,
    patch_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            faults: Mutex::new(Faults::default()),
            patches: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
            patch_attempts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// The wrapped store, for direct manipulation that bypasses all faults.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Seeds an object. Returns its resource version.
    pub async fn insert(&self, object: Object) -> String {
        self.inner.insert(object).await
    }

    /// Current stored copy of `key`.
    pub async fn object(&self, key: &str) -> Option<Object> {
        self.inner.get_object(key).await
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The next `n` patches lose the race against an out-of-band write.
    pub fn conflict_next(&self, n: usize) {
        self.faults().conflicts_remaining = n;
    }

    /// Every patch loses the race against an out-of-band write.
    pub fn conflict_always(&self) {
        self.faults().always_conflict = true;
    }

    /// What the out-of-band write does to the object when a conflict is
    /// provoked. Without one, the write only bumps the resource version.
    pub fn set_external_write<F>(&self, f: F)
    where
        F: Fn(&mut Object) + Send + Sync + 'static,
    {
        self.faults().external_write = Some(Arc::new(f));
    }

    /// Every `get` fails with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, message: impl Into<String>) {
        self.faults().read_failure = Some(message.into());
    }

    /// Every `compute_patch` fails with [`StoreError::Invalid`].
    pub fn fail_diffs(&self, message: impl Into<String>) {
        self.faults().diff_failure = Some(message.into());
    }

    /// Every `apply_patch` fails with [`StoreError::Invalid`].
    pub fn fail_patches(&self, message: impl Into<String>) {
        self.faults().patch_failure = Some(message.into());
    }

    /// Holds every `apply_patch` for `delay` before it touches the store.
    pub fn set_patch_delay(&self, delay: Duration) {
        self.faults().patch_delay = delay;
    }

    /// Removes every injected fault. Counters and recorded patches are kept.
    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }

    /// Every patch submitted so far, in order, including rejected ones.
    pub fn patches(&self) -> Vec<(String, Patch)> {
        self.patches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn patch_attempts(&self) -> usize {
        self.patch_attempts.load(Ordering::SeqCst)
    }

    /// Highest number of `apply_patch` calls ever observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Decides whether this patch should conflict, consuming one injected
    /// conflict if so, and returns the out-of-band write to perform.
    fn take_conflict(&self) -> Option<Option<ExternalWrite>> {
        let mut faults = self.faults();
        if faults.always_conflict {
            return Some(faults.external_write.clone());
        }
        if faults.conflicts_remaining > 0 {
            faults.conflicts_remaining -= 1;
            return Some(faults.external_write.clone());
        }
        None
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter however `apply_patch` exits.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get(&self, key: &str) -> Result<Object, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.faults().read_failure.clone();
        if let Some(message) = failure {
            return Err(StoreError::Unavailable { message });
        }
        self.inner.get(key).await
    }

    fn compute_patch(&self, before: &Value, after: &Value) -> Result<Patch, StoreError> {
        let failure = self.faults().diff_failure.clone();
        if let Some(message) = failure {
            return Err(StoreError::Invalid { message });
        }
        self.inner.compute_patch(before, after)
    }

    async fn apply_patch(&self, key: &str, patch: &Patch) -> Result<Object, StoreError> {
        self.patch_attempts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.patches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((key.to_string(), patch.clone()));

        let (delay, failure) = {
            let faults = self.faults();
            (faults.patch_delay, faults.patch_failure.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = failure {
            return Err(StoreError::Invalid { message });
        }

        if let Some(external_write) = self.take_conflict() {
            debug!(key, "provoking conflict with out-of-band write");
            self.inner
                .modify(key, |object| {
                    if let Some(write) = &external_write {
                        write(object);
                    }
                })
                .await?;
        }

        self.inner.apply_patch(key, patch).await
    }
}
