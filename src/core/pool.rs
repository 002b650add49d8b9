use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::core::FwError;

/// Fixed-size fork/join executor. Each `run` call is one parallel phase:
/// tasks are independent and their results come back in submission order.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, FwError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fwtab-worker-{i}"))
            .build()
            .map_err(|e| FwError::IoError(format!("building worker pool: {e}")))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every task and join. The first failing task aborts the join
    /// and its error is returned.
    pub fn run<T, F>(&self, tasks: Vec<F>) -> Result<Vec<T>, FwError>
    where
        T: Send,
        F: FnOnce() -> Result<T, FwError> + Send,
    {
        if tasks.len() == 1 {
            return tasks.into_iter().map(|task| task()).collect();
        }
        self.pool
            .install(|| tasks.into_par_iter().map(|task| task()).collect())
    }
}

/// Split `0..len` into at most `parts` contiguous, non-empty ranges.
pub fn split_ranges(len: usize, parts: usize) -> Vec<std::ops::Range<usize>> {
    let parts = parts.max(1).min(len.max(1));
    let base = len / parts;
    let extra = len % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        if size == 0 {
            continue;
        }
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_in_submission_order() {
        let pool = WorkerPool::new(4).unwrap();
        let tasks: Vec<_> = (0..16).map(|i| move || Ok(i * 2)).collect();
        let out = pool.run(tasks).unwrap();
        assert_eq!(out, (0..16).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_failure_aborts_join() {
        let pool = WorkerPool::new(2).unwrap();
        let tasks: Vec<Box<dyn FnOnce() -> Result<usize, FwError> + Send>> = vec![
            Box::new(|| Ok(1)),
            Box::new(|| Err(FwError::IoError("boom".into()))),
            Box::new(|| Ok(3)),
        ];
        assert_eq!(pool.run(tasks), Err(FwError::IoError("boom".into())));
    }

    #[test]
    fn test_split_ranges() {
        assert_eq!(split_ranges(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(split_ranges(2, 4), vec![0..1, 1..2]);
        assert_eq!(split_ranges(0, 4), Vec::<std::ops::Range<usize>>::new());
        assert_eq!(split_ranges(5, 1), vec![0..5]);
    }
}
