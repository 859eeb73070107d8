// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single writer: a bounded request queue and the loop that drains it.
//!
//! [`NodeWriter`] handles are cheap to clone and can be used from any task.
//! Every request they submit is executed by the one [`WriterLoop`], one at a
//! time, so this process never has two patches in flight against the store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nodescribe_config::NodescribeConfig;
use nodescribe_core::{ObjectStore, WriterError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::mutation::Mutation;
use crate::recording;
use crate::request::MutationRequest;
use crate::updater::update_with_retry;

/// Runtime settings for a writer and its loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterSettings {
    /// Requests buffered before [`NodeWriter::submit`] blocks.
    pub queue_capacity: usize,
    /// Upper bound on how long a submitter waits; `None` waits indefinitely.
    pub response_timeout: Option<Duration>,
    pub backoff: BackoffPolicy,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self::from(&NodescribeConfig::default())
    }
}

impl From<&NodescribeConfig> for WriterSettings {
    fn from(config: &NodescribeConfig) -> Self {
        Self {
            queue_capacity: config.writer.queue_capacity.max(1),
            response_timeout: match config.writer.response_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            backoff: BackoffPolicy::from(&config.backoff),
        }
    }
}

/// Submitting side of the writer.
#[derive(Clone)]
pub struct NodeWriter {
    tx: mpsc::Sender<MutationRequest>,
    response_timeout: Option<Duration>,
}

impl NodeWriter {
    /// Creates a writer handle and the loop that serves it.
    ///
    /// The loop does nothing until [`WriterLoop::run`] is awaited, typically
    /// on a dedicated task. Run exactly one loop per store.
    pub fn new(store: Arc<dyn ObjectStore>, settings: &WriterSettings) -> (Self, WriterLoop) {
        let capacity = settings.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let writer = Self {
            tx,
            response_timeout: settings.response_timeout,
        };
        let writer_loop = WriterLoop {
            rx,
            store,
            backoff: settings.backoff.clone(),
            capacity,
        };
        (writer, writer_loop)
    }

    /// Applies `mutation` to the object named `key` and waits for the outcome.
    ///
    /// Blocks while the queue is full. Returns [`WriterError::Shutdown`] if the
    /// loop stops before the request is processed, and
    /// [`WriterError::Timeout`] if a response timeout is configured and expires.
    pub async fn submit(
        &self,
        key: impl Into<String>,
        mutation: Mutation,
    ) -> Result<(), WriterError> {
        let (request, response) = MutationRequest::new(key.into(), mutation);

        let exchange = async {
            if self.tx.send(request).await.is_err() {
                return Err(WriterError::Shutdown);
            }
            // A dropped sender means the loop went away without answering.
            response.await.unwrap_or(Err(WriterError::Shutdown))
        };

        match self.response_timeout {
            Some(duration) => tokio::time::timeout(duration, exchange)
                .await
                .unwrap_or(Err(WriterError::Timeout { duration })),
            None => exchange.await,
        }
    }

    /// Whether the loop has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The consuming side: the only place that writes to the store.
pub struct WriterLoop {
    rx: mpsc::Receiver<MutationRequest>,
    store: Arc<dyn ObjectStore>,
    backoff: BackoffPolicy,
    capacity: usize,
}

impl WriterLoop {
    /// Processes requests one at a time until `cancel` fires or every
    /// [`NodeWriter`] handle is dropped.
    ///
    /// A request already being processed is finished before cancellation is
    /// observed. Requests still queued at that point are failed with
    /// [`WriterError::Shutdown`], as are submitters blocked on a full queue.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(capacity = self.capacity, "node writer running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping node writer");
                    break;
                }
                request = self.rx.recv() => match request {
                    Some(request) => self.process(request).await,
                    None => {
                        debug!("all writer handles dropped");
                        break;
                    }
                },
            }
        }

        self.drain();
        info!("node writer stopped");
    }

    async fn process(&self, request: MutationRequest) {
        debug!(
            key = request.key.as_str(),
            mutation = request.mutation.label(),
            "processing mutation"
        );

        let started = Instant::now();
        let result = update_with_retry(
            self.store.as_ref(),
            &request.key,
            &self.backoff,
            &request.mutation,
        )
        .await
        .map(|_| ());
        recording::record_update_latency(started.elapsed().as_secs_f64());

        match &result {
            Ok(()) => recording::record_request("ok"),
            Err(e) => {
                recording::record_request(e.kind());
                debug!(
                    key = e.key().unwrap_or(request.key.as_str()),
                    kind = e.kind(),
                    error = %e,
                    "mutation failed"
                );
            }
        }

        let key = request.key.clone();
        if !request.complete(result) {
            debug!(key = key.as_str(), "submitter stopped waiting before completion");
        }
    }

    /// Closes the queue and fails everything still in it.
    fn drain(&mut self) {
        self.rx.close();

        let mut dropped = 0u64;
        while let Ok(request) = self.rx.try_recv() {
            request.complete(Err(WriterError::Shutdown));
            dropped += 1;
        }

        if dropped > 0 {
            warn!(dropped, "failed queued requests on shutdown");
            recording::record_shutdown_dropped(dropped);
        }
    }
}
