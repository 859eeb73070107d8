// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named state transitions layered over [`NodeWriter::submit`].

use std::collections::BTreeMap;
use std::fmt;

use nodescribe_core::annotations::{CURRENT_CONFIG, SSH_ACCESS, SSH_ACCESSED, STATE};
use nodescribe_core::{NodeState, WriterError};
use tracing::error;

use crate::mutation::{Mutation, annotations};
use crate::writer::NodeWriter;

fn state_mutation(state: NodeState) -> Mutation {
    Mutation::set_annotations(annotations([(STATE, state.to_string().as_str())]))
}

impl NodeWriter {
    /// Merges `annotations` into the object's annotations.
    pub async fn set_annotations(
        &self,
        key: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), WriterError> {
        self.submit(key, Mutation::set_annotations(annotations)).await
    }

    /// Marks the object `Done` and records the configuration now applied to it.
    pub async fn mark_done(&self, key: &str, config_id: &str) -> Result<(), WriterError> {
        let done = NodeState::Done.to_string();
        let mutation = Mutation::set_annotations(annotations([
            (STATE, done.as_str()),
            (CURRENT_CONFIG, config_id),
        ]));
        self.submit(key, mutation).await
    }

    /// Marks the object `Working`.
    pub async fn mark_working(&self, key: &str) -> Result<(), WriterError> {
        self.submit(key, state_mutation(NodeState::Working)).await
    }

    /// Logs `cause` and marks the object `Unreconcilable`.
    ///
    /// A failure to record the state is logged as well and returned.
    pub async fn mark_unreconcilable(
        &self,
        key: &str,
        cause: impl fmt::Display,
    ) -> Result<(), WriterError> {
        error!(key, cause = %cause, "marking unreconcilable");
        let result = self
            .submit(key, state_mutation(NodeState::Unreconcilable))
            .await;
        if let Err(e) = &result {
            error!(key, error = %e, "failed to set unreconcilable state");
        }
        result
    }

    /// Logs `cause` and marks the object `Degraded`.
    ///
    /// A failure to record the state is logged as well and returned.
    pub async fn mark_degraded(&self, key: &str, cause: impl fmt::Display) -> Result<(), WriterError> {
        error!(key, cause = %cause, "marking degraded");
        let result = self.submit(key, state_mutation(NodeState::Degraded)).await;
        if let Err(e) = &result {
            error!(key, error = %e, "failed to set degraded state");
        }
        result
    }

    /// Records that the machine behind the object was accessed over SSH.
    pub async fn mark_ssh_accessed(&self, key: &str) -> Result<(), WriterError> {
        let mutation = Mutation::set_annotations(annotations([(SSH_ACCESS, SSH_ACCESSED)]));
        self.submit(key, mutation).await
    }
}
