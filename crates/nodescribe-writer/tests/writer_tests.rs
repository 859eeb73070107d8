// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the node writer over an instrumented store.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use nodescribe_core::annotations::{CURRENT_CONFIG, SSH_ACCESS, SSH_ACCESSED, STATE};
use nodescribe_core::{Object, StoreError, WriterError};
use nodescribe_test_utils::{FakeStore, TestHarness};
use nodescribe_writer::{BackoffPolicy, Mutation};
use serde_json::json;

/// Polls `condition` until it holds, failing the test after a second.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn patches_never_overlap() {
    let keys: Vec<String> = (0..6).map(|i| format!("node-{i}")).collect();
    let harness = TestHarness::builder()
        .with_objects(keys.clone())
        .with_queue_capacity(4)
        .build()
        .await;
    harness.store.set_patch_delay(Duration::from_millis(2));

    let tasks = (0..24).map(|i| {
        let writer = harness.writer.clone();
        let key = keys[i % keys.len()].clone();
        tokio::spawn(async move {
            let value = i.to_string();
            writer
                .submit(
                    key,
                    Mutation::new("stamp", move |object| {
                        object
                            .metadata
                            .annotations
                            .insert(format!("stamp-{value}"), value.clone());
                    }),
                )
                .await
        })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }
    assert_eq!(harness.store.patch_attempts(), 24);
    assert_eq!(harness.store.max_in_flight(), 1);
}

#[tokio::test]
async fn every_request_completes_once_under_faults() {
    let harness = TestHarness::builder()
        .with_objects(["ok", "contended"])
        .with_backoff(BackoffPolicy::immediate(2))
        .build()
        .await;
    harness.store.conflict_next(5);

    let submissions = [
        ("ok", "a"),
        ("missing", "b"),
        ("contended", "c"),
        ("contended", "d"),
        ("ok", "e"),
        ("missing", "f"),
    ]
    .map(|(key, value)| {
        let writer = harness.writer.clone();
        async move {
            let mut annotations = std::collections::BTreeMap::new();
            annotations.insert("marker".to_string(), value.to_string());
            writer.set_annotations(key, annotations).await
        }
    });

    let results = join_all(submissions).await;
    assert_eq!(results.len(), 6);
    let read_errors = results
        .iter()
        .filter(|r| matches!(r, Err(WriterError::Read { .. })))
        .count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(WriterError::RetryExhausted { .. })))
        .count();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(read_errors, 2);
    assert_eq!(read_errors + exhausted + succeeded, 6);
    assert!(exhausted >= 1, "five conflicts with two attempts each must exhaust something");

    // The loop is still healthy once the injected conflicts run out.
    harness.writer.mark_working("contended").await.unwrap();
}

#[tokio::test]
async fn conflict_retry_diffs_against_latest_snapshot() {
    let harness = TestHarness::builder()
        .with_object(Object::new("node-1").with_annotation("owner", "initial"))
        .build()
        .await;
    let external_writes = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    {
        let external_writes = external_writes.clone();
        harness.store.set_external_write(move |object| {
            let n = external_writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            object
                .metadata
                .annotations
                .insert("owner".into(), format!("external-{n}"));
        });
    }
    harness.store.conflict_next(2);

    harness.writer.mark_working("node-1").await.unwrap();

    assert_eq!(harness.store.get_calls(), 3);
    assert_eq!(harness.store.patch_attempts(), 3);

    let object = harness.object("node-1").await;
    assert_eq!(object.annotation(STATE), Some("Working"));
    assert_eq!(object.annotation("owner"), Some("external-2"));

    let patches = harness.store.patches();
    let versions: Vec<_> = patches
        .iter()
        .map(|(_, patch)| patch.base_version.clone().unwrap())
        .collect();
    assert_ne!(versions[0], versions[1]);
    assert_ne!(versions[1], versions[2]);

    let (key, last) = patches.last().unwrap();
    assert_eq!(key, "node-1");
    assert_eq!(
        last.document,
        json!({ "metadata": { "annotations": { STATE: "Working" } } })
    );
}

#[tokio::test]
async fn retries_stop_after_max_attempts() {
    let harness = TestHarness::builder()
        .with_objects(["node-1"])
        .with_backoff(BackoffPolicy::immediate(3))
        .build()
        .await;
    harness.store.conflict_always();

    let err = harness.writer.mark_working("node-1").await.unwrap_err();
    match err {
        WriterError::RetryExhausted {
            key,
            attempts,
            source,
        } => {
            assert_eq!(key, "node-1");
            assert_eq!(attempts, 3);
            assert!(matches!(source, StoreError::Conflict { .. }));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(harness.store.patch_attempts(), 3);
    assert_eq!(harness.store.get_calls(), 3);
    assert_eq!(harness.object("node-1").await.annotation(STATE), None);
}

#[tokio::test(start_paused = true)]
async fn default_backoff_sleeps_between_attempts() {
    let harness = TestHarness::builder()
        .with_objects(["node-1"])
        .with_backoff(BackoffPolicy {
            jitter: 0.0,
            ..BackoffPolicy::default()
        })
        .build()
        .await;
    harness.store.conflict_always();

    let started = tokio::time::Instant::now();
    let err = harness.writer.mark_working("node-1").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, WriterError::RetryExhausted { attempts: 4, .. }));
    // 10ms + 50ms + 250ms between the four attempts.
    assert!(elapsed >= Duration::from_millis(310), "slept {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1000), "slept {elapsed:?}");
}

#[tokio::test]
async fn store_errors_other_than_conflict_are_not_retried() {
    let harness = TestHarness::builder().with_objects(["node-1"]).build().await;

    harness.store.fail_patches("admission webhook denied");
    let err = harness.writer.mark_working("node-1").await.unwrap_err();
    assert!(matches!(
        err,
        WriterError::Patch {
            source: StoreError::Invalid { .. },
            ..
        }
    ));
    assert_eq!(harness.store.patch_attempts(), 1);

    harness.store.clear_faults();
    harness.store.fail_reads("connection reset");
    let err = harness.writer.mark_working("node-1").await.unwrap_err();
    assert!(matches!(
        err,
        WriterError::Read {
            source: StoreError::Unavailable { .. },
            ..
        }
    ));
    assert_eq!(harness.store.get_calls(), 2);
    assert_eq!(harness.store.patch_attempts(), 1);
}

#[tokio::test]
async fn diff_failure_is_reported_without_retry() {
    let harness = TestHarness::builder().with_objects(["node-1"]).build().await;
    harness.store.fail_diffs("unsupported field type");

    let err = harness.writer.mark_working("node-1").await.unwrap_err();
    assert_eq!(err.key(), Some("node-1"));
    assert!(matches!(
        err,
        WriterError::Diff {
            source: StoreError::Invalid { .. },
            ..
        }
    ));
    assert_eq!(harness.store.get_calls(), 1);
    assert_eq!(harness.store.patch_attempts(), 0);

    harness.store.clear_faults();
    harness.writer.mark_working("node-1").await.unwrap();
}

#[tokio::test]
async fn out_of_range_backoff_keeps_the_loop_alive() {
    let harness = TestHarness::builder()
        .with_objects(["node-1"])
        .with_backoff(BackoffPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            multiplier: -2.0,
            max_delay: Duration::from_millis(5),
            jitter: f64::NAN,
        })
        .build()
        .await;
    harness.store.conflict_next(2);

    harness.writer.mark_working("node-1").await.unwrap();
    assert_eq!(harness.store.patch_attempts(), 3);

    harness.writer.mark_done("node-1", "cfg-v1").await.unwrap();
    assert!(!harness.writer.is_closed());
}

#[tokio::test]
async fn repeated_mutation_yields_same_annotations() {
    let harness = TestHarness::builder().with_objects(["node-1"]).build().await;

    harness.writer.mark_done("node-1", "cfg-v1").await.unwrap();
    let first = harness.object("node-1").await;

    harness.writer.mark_done("node-1", "cfg-v1").await.unwrap();
    let second = harness.object("node-1").await;

    assert_eq!(first.metadata.annotations, second.metadata.annotations);
    // Nothing changed, so the second call had nothing to submit.
    assert_eq!(harness.store.patch_attempts(), 1);
    assert_eq!(first.resource_version(), second.resource_version());
}

#[tokio::test]
async fn mutation_is_reapplied_cleanly_on_retry() {
    let harness = TestHarness::builder().with_objects(["node-1"]).build().await;
    harness.store.conflict_next(3);

    harness.writer.mark_done("node-1", "cfg-v1").await.unwrap();

    let object = harness.object("node-1").await;
    assert_eq!(object.metadata.annotations.len(), 2);
    assert_eq!(object.annotation(STATE), Some("Done"));
    assert_eq!(object.annotation(CURRENT_CONFIG), Some("cfg-v1"));
}

#[tokio::test]
async fn working_then_done_overwrites_state() {
    let harness = TestHarness::builder().with_objects(["node-1"]).build().await;

    harness.writer.mark_working("node-1").await.unwrap();
    let object = harness.object("node-1").await;
    assert_eq!(object.annotation(STATE), Some("Working"));
    assert_eq!(object.annotation(CURRENT_CONFIG), None);

    harness.writer.mark_done("node-1", "cfg-v2").await.unwrap();
    let object = harness.object("node-1").await;
    assert_eq!(object.annotation(STATE), Some("Done"));
    assert_eq!(object.annotation(CURRENT_CONFIG), Some("cfg-v2"));
    assert_eq!(object.metadata.annotations.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_degraded_and_ssh_both_land() {
    let harness = TestHarness::builder().with_objects(["node-1"]).build().await;
    harness.store.set_patch_delay(Duration::from_millis(5));

    let degraded = {
        let writer = harness.writer.clone();
        tokio::spawn(async move { writer.mark_degraded("node-1", "kubelet not ready").await })
    };
    let ssh = {
        let writer = harness.writer.clone();
        tokio::spawn(async move { writer.mark_ssh_accessed("node-1").await })
    };
    degraded.await.unwrap().unwrap();
    ssh.await.unwrap().unwrap();

    let object = harness.object("node-1").await;
    assert_eq!(object.annotation(STATE), Some("Degraded"));
    assert_eq!(object.annotation(SSH_ACCESS), Some(SSH_ACCESSED));
    assert_eq!(harness.store.max_in_flight(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_fails_queued_and_blocked_requests() {
    let store = Arc::new(FakeStore::new());
    store.set_patch_delay(Duration::from_millis(200));
    let harness = TestHarness::builder()
        .with_store(store.clone())
        .with_objects(["node-1", "node-2", "node-3"])
        .with_queue_capacity(1)
        .build()
        .await;
    let cancel = harness.cancel_token();

    let spawn_working = |key: &'static str| {
        let writer = harness.writer.clone();
        tokio::spawn(async move { writer.mark_working(key).await })
    };

    // In flight: dequeued and waiting inside the slow patch.
    let in_flight = spawn_working("node-1");
    wait_until(|| store.patch_attempts() == 1).await;

    // Queued: occupies the single slot.
    let queued = spawn_working("node-2");
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Blocked: waits for space in the full queue.
    let blocked = spawn_working("node-3");
    tokio::time::sleep(Duration::from_millis(20)).await;

    cancel.cancel();

    in_flight
        .await
        .unwrap()
        .expect("the request being processed finishes");
    assert!(matches!(queued.await.unwrap(), Err(WriterError::Shutdown)));
    assert!(matches!(blocked.await.unwrap(), Err(WriterError::Shutdown)));

    assert_eq!(store.patch_attempts(), 1);
    assert!(harness.writer.is_closed());
    harness.shutdown().await;
}

#[tokio::test]
async fn response_timeout_does_not_wedge_the_loop() {
    let store = Arc::new(FakeStore::new());
    store.set_patch_delay(Duration::from_millis(100));
    let harness = TestHarness::builder()
        .with_store(store.clone())
        .with_objects(["node-1"])
        .with_response_timeout(Duration::from_millis(20))
        .build()
        .await;

    let err = harness.writer.mark_working("node-1").await.unwrap_err();
    assert!(matches!(err, WriterError::Timeout { .. }));

    // The abandoned request still runs to completion in the loop.
    wait_until(|| store.patch_attempts() == 1).await;
    store.set_patch_delay(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.object("node-1").await.annotation(STATE), Some("Working"));
}
