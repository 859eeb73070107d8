// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for nodescribe.
//!
//! This crate provides the object and patch model, the [`ObjectStore`] trait
//! that external stores implement, the error taxonomy shared by stores and the
//! writer, and an in-memory store with real optimistic-concurrency semantics.

pub mod annotations;
pub mod error;
pub mod memory;
pub mod patch;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{StoreError, WriterError};
pub use memory::MemoryStore;
pub use patch::{create_json_patch, create_merge_patch};
pub use traits::ObjectStore;
pub use types::{NodeState, Object, ObjectMeta, Patch, PatchKind};
