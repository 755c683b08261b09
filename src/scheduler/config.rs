//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::predictor::DEFAULT_PARALLEL_THRESHOLD;

/// Order in which movable items are appended to the seed plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedOrder {
    /// As supplied by the caller.
    #[default]
    InputOrder,
    /// Largest duration summary first (ties by id).
    LongestFirst,
    /// Smallest duration summary first (ties by id).
    ShortestFirst,
    /// Deterministic shuffle.
    Shuffled { seed: u64 },
}

/// Tuning knobs of [`RepairScheduler`](super::RepairScheduler).
///
/// # Examples
///
/// ```
/// use u_repair::scheduler::{SchedulerConfig, SeedOrder};
///
/// let config = SchedulerConfig::default()
///     .with_seed_order(SeedOrder::LongestFirst)
///     .with_max_iterations(10_000);
/// assert!(config.use_prediction);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Use the predictor's definite estimate to reject candidates early.
    pub use_prediction: bool,
    /// Record a snapshot after every accepted move and escape.
    pub record_snapshots: bool,
    /// Seed the next run from the previous run's result.
    pub reuse_previous_result: bool,
    /// Order of greedy seeding.
    pub seed_order: SeedOrder,
    /// Threads of a dedicated merge pool; `None` uses the global pool.
    pub worker_threads: Option<usize>,
    /// Minimum number of middle segments before a merge fans out.
    pub parallel_merge_threshold: usize,
    /// Loop budget; `None` runs until done or failed.
    pub max_iterations: Option<usize>,
    /// Validate items and fixed placements before seeding.
    pub validate_input: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            use_prediction: true,
            record_snapshots: true,
            reuse_previous_result: false,
            seed_order: SeedOrder::InputOrder,
            worker_threads: None,
            parallel_merge_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_iterations: None,
            validate_input: true,
        }
    }
}

impl SchedulerConfig {
    pub fn with_prediction(mut self, use_prediction: bool) -> Self {
        self.use_prediction = use_prediction;
        self
    }

    pub fn with_snapshots(mut self, record_snapshots: bool) -> Self {
        self.record_snapshots = record_snapshots;
        self
    }

    pub fn with_result_reuse(mut self, reuse_previous_result: bool) -> Self {
        self.reuse_previous_result = reuse_previous_result;
        self
    }

    pub fn with_seed_order(mut self, seed_order: SeedOrder) -> Self {
        self.seed_order = seed_order;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_parallel_merge_threshold(mut self, threshold: usize) -> Self {
        self.parallel_merge_threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    pub fn with_validation(mut self, validate_input: bool) -> Self {
        self.validate_input = validate_input;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert!(config.use_prediction);
        assert!(config.record_snapshots);
        assert!(!config.reuse_previous_result);
        assert_eq!(config.seed_order, SeedOrder::InputOrder);
        assert_eq!(config.worker_threads, None);
        assert_eq!(config.parallel_merge_threshold, 64);
        assert_eq!(config.max_iterations, None);
        assert!(config.validate_input);
    }

    #[test]
    fn test_serde_partial_document() {
        let json = r#"{"seed_order":{"Shuffled":{"seed":7}},"worker_threads":2}"#;
        let config: SchedulerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seed_order, SeedOrder::Shuffled { seed: 7 });
        assert_eq!(config.worker_threads, Some(2));
        assert!(config.use_prediction);

        let back: SchedulerConfig =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
