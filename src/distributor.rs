//! Static work distribution over the session pool.
//!
//! [`distribute`] splits a list of work items into contiguous chunks, one
//! per worker slot, runs every worker concurrently on its own session, and
//! returns only when every chunk has been processed: the completion
//! barrier. There is no work stealing; a worker that finishes early idles.
//!
//! One slot may instead be given a [`PreloadJob`] (discovering the next
//! source while this one is extracted). Roles are fixed once, at dispatch
//! time, by [`plan`].
//!
//! # Partitioning
//!
//! `n` items over `k` workers gives chunks of `n / k` items, the first
//! `n % k` chunks taking one extra, in original order:
//!
//! ```text
//! n = 23, k = 5  ->  [5, 5, 5, 4, 4]
//! ```

use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, instrument, warn};

/// What one worker slot does for the duration of a parallel phase.
#[derive(Debug, PartialEq, Eq)]
pub enum WorkerRole<T, J> {
    /// Process this contiguous chunk of items, in order.
    Extractor(Vec<T>),
    /// Run this job on the slot's session instead of taking a chunk.
    Preloader(J),
}

/// Per-item work run inside a worker loop.
pub trait ChunkHandler<S> {
    type Item;

    /// Short description of an item for logs.
    fn label(&self, item: &Self::Item) -> String;

    /// Process one item. Expected failures must be handled here; they never
    /// reach the distributor.
    async fn handle(&self, worker: usize, session: &mut S, item: Self::Item);

    /// Called when `handle` panicked on the item labelled `label`. The
    /// worker carries on with the rest of its chunk afterwards.
    async fn on_panic(&self, worker: usize, label: String) {
        error!(worker, item = %label, "Item handler panicked; continuing with next item");
    }
}

/// A job run by the reserved slot.
pub trait PreloadJob<S> {
    type Output;

    async fn run(self, session: &mut S) -> Self::Output;
}

/// No preload job; [`distribute`] with `None::<NoPreload>` uses every slot
/// for items.
#[derive(Debug)]
pub enum NoPreload {}

impl<S> PreloadJob<S> for NoPreload {
    type Output = ();

    async fn run(self, _session: &mut S) -> Self::Output {
        match self {}
    }
}

/// Split `items` into `parts` contiguous chunks whose sizes differ by at most
/// one, larger chunks first.
///
/// `parts == 0` is treated as one part. Chunks may be empty when there are
/// fewer items than parts.
pub fn partition<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let n = items.len();
    let base = n / parts;
    let extra = n % parts;
    let mut iter = items.into_iter();
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < extra);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Assign a role to each of `workers` slots.
///
/// With a preload job and at least two workers, the last slot becomes the
/// preloader and items are partitioned over the remaining `workers - 1`.
/// With a single worker there is no slot to spare: the job is dropped and
/// the caller falls back to discovering cold.
pub fn plan<T, J>(items: Vec<T>, workers: usize, preload: Option<J>) -> Vec<WorkerRole<T, J>> {
    let workers = workers.max(1);
    match preload {
        Some(job) if workers >= 2 => {
            let mut roles: Vec<_> = partition(items, workers - 1)
                .into_iter()
                .map(WorkerRole::Extractor)
                .collect();
            roles.push(WorkerRole::Preloader(job));
            roles
        }
        preload => {
            if preload.is_some() {
                warn!(workers, "No spare worker for preloading; preload job dropped");
            }
            partition(items, workers)
                .into_iter()
                .map(WorkerRole::Extractor)
                .collect()
        }
    }
}

enum WorkerDone<O> {
    Chunk { processed: usize },
    Preloaded(O),
}

/// Run `items` across all `sessions` and wait for every worker to finish.
///
/// Each session is driven by exactly one worker for the whole phase. Returns
/// the preload job's output when one was given a slot.
#[instrument(level = "info", skip_all, fields(workers = sessions.len(), items = items.len()))]
pub async fn distribute<S, H, J>(
    sessions: &mut [S],
    items: Vec<H::Item>,
    handler: &H,
    preload: Option<J>,
) -> Option<J::Output>
where
    H: ChunkHandler<S>,
    J: PreloadJob<S>,
{
    if sessions.is_empty() {
        warn!("No sessions available; nothing distributed");
        return None;
    }
    let roles = plan(items, sessions.len(), preload);

    let workers = roles
        .into_iter()
        .zip(sessions.iter_mut())
        .enumerate()
        .map(move |(worker, (role, session))| async move {
            match role {
                WorkerRole::Extractor(chunk) => {
                    let size = chunk.len();
                    debug!(worker, chunk = size, "Worker started");
                    for item in chunk {
                        let label = handler.label(&item);
                        let outcome = AssertUnwindSafe(handler.handle(worker, session, item))
                            .catch_unwind()
                            .await;
                        if outcome.is_err() {
                            handler.on_panic(worker, label).await;
                        }
                    }
                    debug!(worker, "Worker finished chunk");
                    WorkerDone::Chunk { processed: size }
                }
                WorkerRole::Preloader(job) => {
                    debug!(worker, "Worker preloading");
                    WorkerDone::Preloaded(job.run(session).await)
                }
            }
        });

    // Completion barrier: every worker, including ones whose items failed.
    let outcomes = join_all(workers).await;

    let mut processed = 0;
    let mut preloaded = None;
    for outcome in outcomes {
        match outcome {
            WorkerDone::Chunk { processed: n } => processed += n,
            WorkerDone::Preloaded(output) => preloaded = Some(output),
        }
    }
    info!(processed, "All workers finished");
    preloaded
}
