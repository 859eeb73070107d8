// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nodescribe simulate`: many producers reporting node state through one writer.
//!
//! Seeds an in-memory store, runs the writer loop over it, and lets a set of
//! producer tasks fire random state transitions at random objects. With
//! `--churn` a background task keeps rewriting the objects out of band, so the
//! writer has real version conflicts to retry through.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use nodescribe_core::{MemoryStore, Object, WriterError};
use nodescribe_writer::{NodeWriter, WriterSettings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Options for the `simulate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of objects to seed.
    #[arg(long, default_value_t = 4)]
    pub objects: usize,

    /// Number of concurrent producer tasks.
    #[arg(long, default_value_t = 8)]
    pub producers: usize,

    /// Transitions each producer submits.
    #[arg(long, default_value_t = 5)]
    pub rounds: usize,

    /// Rewrite objects out of band while producers run.
    #[arg(long)]
    pub churn: bool,

    /// Seed for the producers' random choices.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Outcome of a simulation run, printed as JSON.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub submitted: usize,
    pub succeeded: usize,
    /// Failures keyed by [`WriterError::kind`].
    pub failed: BTreeMap<&'static str, usize>,
    pub churn_writes: usize,
    pub objects: Vec<Object>,
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Working,
    Done,
    Degraded,
    Unreconcilable,
    SshAccessed,
}

impl Transition {
    const ALL: [Transition; 5] = [
        Transition::Working,
        Transition::Done,
        Transition::Degraded,
        Transition::Unreconcilable,
        Transition::SshAccessed,
    ];

    async fn submit(
        self,
        writer: &NodeWriter,
        key: &str,
        producer: usize,
        round: usize,
    ) -> Result<(), WriterError> {
        match self {
            Transition::Working => writer.mark_working(key).await,
            Transition::Done => {
                writer
                    .mark_done(key, &format!("cfg-p{producer}-r{round}"))
                    .await
            }
            Transition::Degraded => {
                writer
                    .mark_degraded(key, format!("producer {producer} saw a failed probe"))
                    .await
            }
            Transition::Unreconcilable => {
                writer
                    .mark_unreconcilable(key, format!("producer {producer} gave up"))
                    .await
            }
            Transition::SshAccessed => writer.mark_ssh_accessed(key).await,
        }
    }
}

/// Runs the simulation to completion or until `cancel` fires.
pub async fn run_simulation(
    args: &SimulateArgs,
    settings: &WriterSettings,
    cancel: CancellationToken,
) -> SimulationReport {
    let store = Arc::new(MemoryStore::new());
    let keys: Arc<Vec<String>> = Arc::new((0..args.objects).map(|i| format!("node-{i}")).collect());
    for key in keys.iter() {
        store.insert(Object::new(key.clone())).await;
    }

    let (writer, writer_loop) = NodeWriter::new(store.clone(), settings);
    let loop_cancel = cancel.child_token();
    let loop_handle = tokio::spawn(writer_loop.run(loop_cancel.clone()));

    let churn_cancel = cancel.child_token();
    let churn_handle = (args.churn && !keys.is_empty())
        .then(|| tokio::spawn(churn(store.clone(), keys.clone(), churn_cancel.clone())));

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        objects = args.objects,
        producers = args.producers,
        rounds = args.rounds,
        churn = args.churn,
        seed,
        "starting simulation"
    );

    let mut producers = JoinSet::new();
    if !keys.is_empty() {
        for producer in 0..args.producers {
            producers.spawn(produce(
                writer.clone(),
                keys.clone(),
                producer,
                args.rounds,
                seed.wrapping_add(producer as u64),
                cancel.clone(),
            ));
        }
    }
    drop(writer);

    let mut submitted = 0;
    let mut succeeded = 0;
    let mut failed = BTreeMap::new();
    while let Some(joined) = producers.join_next().await {
        let results = match joined {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "producer task failed");
                continue;
            }
        };
        for result in results {
            submitted += 1;
            match result {
                Ok(()) => succeeded += 1,
                Err(e) => *failed.entry(e.kind()).or_insert(0) += 1,
            }
        }
    }

    churn_cancel.cancel();
    let churn_writes = match churn_handle {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "churn task failed");
            0
        }),
        None => 0,
    };

    // Every writer handle is gone, so the loop stops on its own.
    if let Err(e) = loop_handle.await {
        warn!(error = %e, "writer loop task failed");
    }

    let mut objects = Vec::with_capacity(keys.len());
    for key in keys.iter() {
        if let Some(object) = store.get_object(key).await {
            objects.push(object);
        }
    }

    info!(submitted, succeeded, churn_writes, "simulation finished");
    SimulationReport {
        submitted,
        succeeded,
        failed,
        churn_writes,
        objects,
    }
}

async fn produce(
    writer: NodeWriter,
    keys: Arc<Vec<String>>,
    producer: usize,
    rounds: usize,
    seed: u64,
    cancel: CancellationToken,
) -> Vec<Result<(), WriterError>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut results = Vec::with_capacity(rounds);

    for round in 0..rounds {
        if cancel.is_cancelled() {
            debug!(producer, round, "producer stopping early");
            break;
        }
        let key = &keys[rng.gen_range(0..keys.len())];
        let transition = Transition::ALL[rng.gen_range(0..Transition::ALL.len())];
        debug!(producer, round, key = key.as_str(), ?transition, "submitting");
        results.push(transition.submit(&writer, key, producer, round).await);
    }

    results
}

/// Rewrites a random object every millisecond until cancelled.
/// Returns how many writes it made.
async fn churn(store: Arc<MemoryStore>, keys: Arc<Vec<String>>, cancel: CancellationToken) -> usize {
    let mut rng = StdRng::from_entropy();
    let mut writes: usize = 0;
    let mut tick = tokio::time::interval(Duration::from_millis(1));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                let key = &keys[rng.gen_range(0..keys.len())];
                let generation = writes.to_string();
                match store
                    .modify(key, |object| {
                        object.metadata.labels.insert("churn".into(), generation);
                    })
                    .await
                {
                    Ok(_) => writes += 1,
                    Err(e) => warn!(key = key.as_str(), error = %e, "churn write failed"),
                }
            }
        }
    }

    debug!(writes, "churn stopped");
    writes
}
