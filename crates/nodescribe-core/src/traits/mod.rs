// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the external collaborators nodescribe consumes.
//!
//! Traits use `#[async_trait]` so they can be held as `Arc<dyn ...>`.

pub mod store;

pub use store::ObjectStore;
