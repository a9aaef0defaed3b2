//! Partitioned multi-threaded counting.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::try_join_all;

use super::serial::count_serial;
use super::timing::{CountResult, timed};
use super::{Algorithm, CountError, Counter, Target};
use crate::corpus::TokenSequence;

/// How long the caller waits for all workers before giving up.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Split `[0, n)` into contiguous, non-overlapping, non-empty ranges.
///
/// At most `workers` ranges are produced, each `n / workers` long, with the
/// last absorbing the remainder.  When `n < workers` every range holds a
/// single index, so fewer ranges than workers come back.  `workers == 0` is
/// treated as one worker.
#[must_use]
pub fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
    let parts = workers.max(1).min(n);
    if parts == 0 {
        return Vec::new();
    }
    let size = n / parts;
    (0..parts)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == parts { n } else { start + size };
            start..end
        })
        .collect()
}

/// Number of hardware execution units, queried at runtime.
#[must_use]
pub fn available_workers() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Count tokens equal to `target` across `workers` parallel partitions.
pub fn count_partitioned(
    tokens: &TokenSequence,
    target: &Target,
    workers: NonZeroUsize,
    timeout: Duration,
) -> Result<u64, CountError> {
    let tokens = tokens.clone();
    let target = target.clone();
    run_partitioned(tokens.len(), workers, timeout, move |range| {
        count_serial(tokens.range(range), &target)
    })
}

/// Terminal state of a partitioned run.
enum JoinOutcome {
    AllJoined,
    TimedOut,
    Panicked(String),
}

/// Dispatch one blocking task per partition of `[0, n)` and sum their counts
/// into a shared atomic sink.
///
/// Blocks until every task has finished or `timeout` elapses.  On timeout the
/// pool is shut down in the background and the stragglers are abandoned;
/// they still hold their own handle to the sink, so nothing they do after
/// that point is observed.
fn run_partitioned<F>(
    n: usize,
    workers: NonZeroUsize,
    timeout: Duration,
    count_range: F,
) -> Result<u64, CountError>
where
    F: Fn(Range<usize>) -> u64 + Send + Sync + 'static,
{
    let partitions = partition(n, workers.get());
    if partitions.is_empty() {
        return Ok(0);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .max_blocking_threads(workers.get())
        .enable_time()
        .build()
        .map_err(CountError::WorkerPool)?;

    let count_range = Arc::new(count_range);
    let total = Arc::new(AtomicU64::new(0));

    let outcome = rt.block_on(async {
        let handles: Vec<_> = partitions
            .into_iter()
            .map(|range| {
                let count_range = Arc::clone(&count_range);
                let total = Arc::clone(&total);
                tokio::task::spawn_blocking(move || {
                    let partial = count_range(range);
                    total.fetch_add(partial, Ordering::Relaxed);
                })
            })
            .collect();

        match tokio::time::timeout(timeout, try_join_all(handles)).await {
            Ok(Ok(_)) => JoinOutcome::AllJoined,
            Ok(Err(e)) => JoinOutcome::Panicked(e.to_string()),
            Err(_) => JoinOutcome::TimedOut,
        }
    });
    rt.shutdown_background();

    match outcome {
        // Joining every task orders all their adds before this load.
        JoinOutcome::AllJoined => Ok(total.load(Ordering::Relaxed)),
        JoinOutcome::TimedOut => Err(CountError::Timeout { after: timeout }),
        JoinOutcome::Panicked(msg) => Err(CountError::WorkerPanicked(msg)),
    }
}

/// Multi-threaded CPU strategy.
#[derive(Clone, Copy, Debug)]
pub struct ParallelCounter {
    workers: NonZeroUsize,
    timeout: Duration,
}

impl Default for ParallelCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelCounter {
    /// One worker per available hardware thread, one-hour join bound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: available_workers(),
            timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    /// Override the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    /// Override the join bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured worker count.
    #[must_use]
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }
}

impl Counter for ParallelCounter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ParallelCpu
    }

    fn count(&self, path: &Path, target: &Target) -> Result<CountResult, CountError> {
        timed(|| {
            let tokens = TokenSequence::load(path)?;
            count_partitioned(&tokens, target, self.workers, self.timeout)
        })
    }
}
