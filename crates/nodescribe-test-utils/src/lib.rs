// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for nodescribe integration tests.
//!
//! Provides an instrumented store and a harness that runs a writer loop, for
//! fast, deterministic tests without a real object store.
//!
//! # Components
//!
//! - [`FakeStore`] - in-memory store with conflict and failure injection
//! - [`TestHarness`] - writer handle plus a running loop over a [`FakeStore`]

pub mod fake_store;
pub mod harness;

pub use fake_store::FakeStore;
pub use harness::TestHarness;
