// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer gateway for object state updates.
//!
//! Many tasks report state changes through cloned [`NodeWriter`] handles.
//! One [`WriterLoop`] task applies them to the [`ObjectStore`](nodescribe_core::ObjectStore)
//! one at a time, each with a read-modify-diff-patch cycle that retries on
//! version conflicts.
//!
//! ```no_run
//! # async fn example(store: std::sync::Arc<dyn nodescribe_core::ObjectStore>) {
//! use nodescribe_writer::{NodeWriter, WriterSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! let (writer, writer_loop) = NodeWriter::new(store, &WriterSettings::default());
//! let cancel = CancellationToken::new();
//! tokio::spawn(writer_loop.run(cancel.clone()));
//!
//! writer.mark_working("node-1").await.expect("state recorded");
//! writer.mark_done("node-1", "rendered-config-42").await.expect("state recorded");
//! cancel.cancel();
//! # }
//! ```

pub mod backoff;
pub mod mutation;
pub mod recording;
mod request;
pub mod transitions;
pub mod updater;
pub mod writer;

pub use backoff::BackoffPolicy;
pub use mutation::Mutation;
pub use updater::update_with_retry;
pub use writer::{NodeWriter, WriterLoop, WriterSettings};
