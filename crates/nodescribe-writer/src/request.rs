// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message passed from submitters to the writer loop.

use nodescribe_core::WriterError;
use tokio::sync::oneshot;

use crate::mutation::Mutation;

/// Result delivered on a request's completion channel.
pub(crate) type Completion = Result<(), WriterError>;

/// A pending mutation of one object plus the channel its outcome is sent on.
///
/// Owned by the queue until the loop dequeues it; consumed by [`complete`](Self::complete),
/// so the outcome can be delivered at most once.
pub(crate) struct MutationRequest {
    pub(crate) key: String,
    pub(crate) mutation: Mutation,
    respond_to: oneshot::Sender<Completion>,
}

impl MutationRequest {
    pub(crate) fn new(
        key: String,
        mutation: Mutation,
    ) -> (Self, oneshot::Receiver<Completion>) {
        let (respond_to, response) = oneshot::channel();
        (
            Self {
                key,
                mutation,
                respond_to,
            },
            response,
        )
    }

    /// Delivers the outcome. Returns `false` if the submitter stopped waiting.
    pub(crate) fn complete(self, result: Completion) -> bool {
        self.respond_to.send(result).is_ok()
    }
}
