//! Bounded worker pool with round-robin task assignment.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::RfError;

/// A pool of `min(num_threads, n_tasks)` workers, built for a single call.
///
/// Worker `w` owns tasks `w, w + W, w + 2W, …` where `W` is the worker
/// count. Workers share only what the task closure borrows; the pool is
/// dropped, and its threads released, when the call returns.
pub(crate) struct WorkerPool {
    pool: ThreadPool,
    n_workers: usize,
}

impl WorkerPool {
    /// Build a pool sized for `n_tasks` tasks.
    pub(crate) fn new(num_threads: usize, n_tasks: usize) -> Result<Self, RfError> {
        if num_threads == 0 {
            return Err(RfError::InvalidThreadCount { num_threads });
        }
        let n_workers = num_threads.min(n_tasks).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .thread_name(|i| format!("grove-worker-{i}"))
            .build()
            .map_err(|source| RfError::ThreadPool {
                num_threads: n_workers,
                source,
            })?;
        debug!(n_workers, n_tasks, "worker pool ready");
        Ok(Self { pool, n_workers })
    }

    /// Number of workers in the pool.
    pub(crate) fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Run `op` inside the pool so rayon parallel iterators use its workers.
    pub(crate) fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// Run `task(i)` for every `i in 0..n_tasks`, round-robin across workers.
    ///
    /// Results come back in task order regardless of completion order. The
    /// first error aborts the call.
    pub(crate) fn map_round_robin<T, F>(&self, n_tasks: usize, task: F) -> Result<Vec<T>, RfError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, RfError> + Sync,
    {
        let n_workers = self.n_workers;
        let per_worker: Vec<Vec<(usize, T)>> = self.pool.install(|| {
            (0..n_workers)
                .into_par_iter()
                .map(|worker| {
                    (worker..n_tasks)
                        .step_by(n_workers)
                        .map(|i| task(i).map(|out| (i, out)))
                        .collect::<Result<Vec<_>, RfError>>()
                })
                .collect::<Result<Vec<_>, RfError>>()
        })?;

        let mut slots: Vec<Option<T>> = (0..n_tasks).map(|_| None).collect();
        for (i, out) in per_worker.into_iter().flatten() {
            slots[i] = Some(out);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Fold tasks into one private accumulator per worker, round-robin.
    ///
    /// Returns the accumulators in worker order for the caller to reduce
    /// after every worker has finished.
    pub(crate) fn fold_round_robin<A, I, F>(
        &self,
        n_tasks: usize,
        init: I,
        fold: F,
    ) -> Result<Vec<A>, RfError>
    where
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, usize) -> Result<(), RfError> + Sync,
    {
        let n_workers = self.n_workers;
        self.pool.install(|| {
            (0..n_workers)
                .into_par_iter()
                .map(|worker| -> Result<A, RfError> {
                    let mut acc = init();
                    for i in (worker..n_tasks).step_by(n_workers) {
                        fold(&mut acc, i)?;
                    }
                    Ok(acc)
                })
                .collect()
        })
    }
}
