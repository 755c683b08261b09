//! Scatter/gather over index ranges for curve merges.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

use crate::error::ScheduleError;

/// Default minimum number of segments before a merge fans out.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// Worker pool used for the middle-segment merges of conflict curves.
///
/// `gather` blocks until every segment is computed and returns results in
/// index order, so callers never observe partial merges.
#[derive(Debug, Clone)]
pub struct MergePool {
    pool: Option<Arc<ThreadPool>>,
    threshold: usize,
}

impl Default for MergePool {
    fn default() -> Self {
        Self::global(DEFAULT_PARALLEL_THRESHOLD)
    }
}

impl MergePool {
    /// Uses rayon's global pool.
    pub fn global(threshold: usize) -> Self {
        Self {
            pool: None,
            threshold,
        }
    }

    /// Uses a dedicated pool of `threads` workers.
    pub fn dedicated(threads: usize, threshold: usize) -> Result<Self, ScheduleError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("u-repair-merge-{i}"))
            .build()?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
            threshold,
        })
    }

    /// Never fans out.
    pub fn sequential() -> Self {
        Self::global(usize::MAX)
    }

    /// Computes `f(0..len)` and collects the results in index order.
    pub(crate) fn gather<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if len < self.threshold.max(2) {
            return (0..len).map(f).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| (0..len).into_par_iter().map(&f).collect()),
            None => (0..len).into_par_iter().map(f).collect(),
        }
    }
}
