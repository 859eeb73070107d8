// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Annotation keys and values owned by nodescribe.

/// Current lifecycle state of the object, one of [`NodeState`](crate::NodeState).
pub const STATE: &str = "nodescribe.io/state";

/// Identifier of the configuration most recently applied to the object.
pub const CURRENT_CONFIG: &str = "nodescribe.io/current-config";

/// Set once the machine behind the object has been accessed over SSH.
pub const SSH_ACCESS: &str = "nodescribe.io/ssh";

/// Value written to [`SSH_ACCESS`].
pub const SSH_ACCESSED: &str = "accessed";
