//! Heuristic repair loop.
//!
//! # Algorithm
//!
//! 1. **Seeding**: fixed placements first, then greedy list scheduling.
//! 2. **Repairing**: take the worst violator, scan the plan's boundary times
//!    as candidate starts and apply the best strictly improving move. When
//!    no move improves, restore the item and continue with the next-worse
//!    violator (a backstep).
//! 3. **Escaping**: when every violator was passed over while hard
//!    constraints still fail, try dependency replan, shift right and shift
//!    left in turn and adopt the first strictly better plan. If none is
//!    better the run fails.
//!
//! The loop stops once hard constraints hold and no violator can improve.
//!
//! # Reference
//! Minton et al. (1992), "Minimizing conflicts: a heuristic repair method
//! for constraint satisfaction and scheduling problems"

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::escape;
use super::seed::{order_items, seed_plan};
use super::{PlanKpi, SchedulerConfig};
use crate::constraint::ConstraintSet;
use crate::error::{FailureReason, ScheduleError};
use crate::models::{Item, ItemId, Plan, ScheduledItem};
use crate::predictor::MergePool;
use crate::selector::ConfigurationSelector;
use crate::tracker::{ViolationTracker, Violator};
use crate::validation::validate_input;

/// Plan state recorded after seeding and after every accepted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Position in the run, starting at 0 for the seed plan.
    pub step: usize,
    pub makespan: i64,
    pub assignments: BTreeMap<ItemId, i64>,
}

impl Snapshot {
    fn of(step: usize, plan: &Plan) -> Self {
        Self {
            step,
            makespan: plan.makespan(),
            assignments: plan.assignments(),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub plan: Plan,
    /// Scans that ended without an improving move.
    pub backsteps: usize,
    pub snapshots: Vec<Snapshot>,
    /// Violators handled by the loop.
    pub iterations: usize,
    /// Local-optimum escapes performed.
    pub escapes: usize,
}

impl ScheduleOutcome {
    /// Item → start mapping of the final plan.
    pub fn assignments(&self) -> BTreeMap<ItemId, i64> {
        self.plan.assignments()
    }

    pub fn makespan(&self) -> i64 {
        self.plan.makespan()
    }

    pub fn kpi(&self) -> PlanKpi {
        PlanKpi::calculate(&self.plan)
    }
}

type Strategy = fn(&Plan, &ViolationTracker, ItemId) -> Result<Plan, ScheduleError>;

const ESCAPE_STRATEGIES: [(&str, Strategy); 3] = [
    ("dependency replan", escape::dependency_replan),
    ("shift right", escape::shift_right),
    ("shift left", escape::shift_left),
];

/// Constraint-based heuristic repair scheduler.
///
/// # Example
///
/// ```
/// use u_repair::constraint::{ConstraintSet, Dependency, NoOverlap, StartAsap};
/// use u_repair::models::{Item, Lane};
/// use u_repair::scheduler::RepairScheduler;
///
/// let constraints = ConstraintSet::new()
///     .with_single(StartAsap)
///     .with_pair(NoOverlap)
///     .with_pair(Dependency);
/// let items = vec![
///     Item::on_lane(1, Lane::new(0), 100).unwrap(),
///     Item::on_lane(2, Lane::new(0), 100).unwrap(),
/// ];
///
/// let mut scheduler = RepairScheduler::new(constraints);
/// let outcome = scheduler.schedule(&items, &[]).unwrap();
/// assert_eq!(outcome.makespan(), 200);
/// ```
#[derive(Debug)]
pub struct RepairScheduler {
    tracker: ViolationTracker,
    selector: ConfigurationSelector,
    config: SchedulerConfig,
    previous: Option<Plan>,
}

impl RepairScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new(constraints: ConstraintSet) -> Self {
        Self {
            tracker: ViolationTracker::new(constraints),
            selector: ConfigurationSelector::new(),
            config: SchedulerConfig::default(),
            previous: None,
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Tracker state as left by the last run.
    pub fn tracker(&self) -> &ViolationTracker {
        &self.tracker
    }

    /// Final plan of the last successful run.
    pub fn previous_result(&self) -> Option<&Plan> {
        self.previous.as_ref()
    }

    pub fn clear_previous_result(&mut self) {
        self.previous = None;
    }

    /// Schedules `items` around the `fixed` placements.
    ///
    /// # Errors
    /// - [`ScheduleError::InvalidInput`] when validation is enabled and fails.
    /// - [`ScheduleError::IllegalPlanOperation`] when a fixed placement
    ///   collides with another by id and validation is disabled.
    /// - [`ScheduleError::SchedulingFailed`] when the loop gives up.
    #[instrument(skip_all, fields(items = items.len(), fixed = fixed.len()))]
    pub fn schedule(
        &mut self,
        items: &[Item],
        fixed: &[ScheduledItem],
    ) -> Result<ScheduleOutcome, ScheduleError> {
        if self.config.validate_input {
            validate_input(items, fixed).map_err(ScheduleError::InvalidInput)?;
        }
        info!("repair scheduling started");

        let threshold = self.config.parallel_merge_threshold;
        let pool = match self.config.worker_threads {
            Some(threads) => MergePool::dedicated(threads, threshold)?,
            None => MergePool::global(threshold),
        };
        self.tracker.set_merge_pool(pool);
        self.tracker.set_prediction(self.config.use_prediction);

        let ordered = order_items(items, self.config.seed_order);
        let previous = self
            .previous
            .as_ref()
            .filter(|_| self.config.reuse_previous_result);
        let (plan, reused) = seed_plan(&ordered, fixed, previous)?;
        debug!(reused, makespan = plan.makespan(), "seed plan built");

        let mut run = Run {
            plan,
            tracker: &mut self.tracker,
            selector: &mut self.selector,
            config: &self.config,
            snapshots: Vec::new(),
            backsteps: 0,
            iterations: 0,
            escapes: 0,
        };
        run.snapshot();
        if !run.plan.is_empty() {
            run.tracker.initialize(&run.plan);
            run.reject_fixed_conflicts()?;
            run.repair()?;
        }
        let outcome = run.finish();

        info!(
            makespan = outcome.makespan(),
            backsteps = outcome.backsteps,
            iterations = outcome.iterations,
            escapes = outcome.escapes,
            "repair scheduling finished"
        );
        self.previous = Some(outcome.plan.clone());
        Ok(outcome)
    }
}

/// Mutable state of one scheduling run.
struct Run<'a> {
    plan: Plan,
    tracker: &'a mut ViolationTracker,
    selector: &'a mut ConfigurationSelector,
    config: &'a SchedulerConfig,
    snapshots: Vec<Snapshot>,
    backsteps: usize,
    iterations: usize,
    escapes: usize,
}

impl Run<'_> {
    fn failure(&self, reason: FailureReason) -> ScheduleError {
        warn!(%reason, makespan = self.plan.makespan(), "repair scheduling failed");
        ScheduleError::SchedulingFailed {
            reason,
            assignments: self.plan.assignments(),
        }
    }

    fn snapshot(&mut self) {
        if self.config.record_snapshots {
            let step = self.snapshots.len();
            self.snapshots.push(Snapshot::of(step, &self.plan));
        }
    }

    fn reject_fixed_conflicts(&self) -> Result<(), ScheduleError> {
        let items = self.tracker.fixed_conflicts(&self.plan);
        if items.is_empty() {
            Ok(())
        } else {
            Err(self.failure(FailureReason::FixedItemsConflict { items }))
        }
    }

    fn repair(&mut self) -> Result<(), ScheduleError> {
        let mut violator = self.tracker.biggest_violator(None);
        let mut hard_satisfied = violator.as_ref().is_some_and(|v| v.hard() == 0);

        while let Some(current) = violator {
            self.iterations += 1;
            if let Some(limit) = self.config.max_iterations {
                if self.iterations > limit {
                    return Err(self.failure(FailureReason::IterationLimit { limit }));
                }
            }

            self.selector.reset_for(&current, &self.plan);
            if self.plan.can_be_moved(current.id()) {
                self.scan(&current)?;
            }

            if self.selector.apply_best(&mut self.plan, self.tracker)? {
                debug!(
                    item = current.id(),
                    start = self.plan.get(current.id()).map(ScheduledItem::start),
                    makespan = self.plan.makespan(),
                    "move applied"
                );
            } else {
                self.selector.apply_reference(&mut self.plan)?;
                self.backsteps += 1;
                debug!(item = current.id(), backsteps = self.backsteps, "no improving move");

                violator = self.tracker.biggest_violator(Some(&current));
                match (&violator, hard_satisfied) {
                    (Some(_), _) => continue,
                    (None, true) => break,
                    (None, false) => self.escape()?,
                }
            }

            self.snapshot();
            violator = self.tracker.biggest_violator(None);
            if violator.as_ref().map_or(true, |v| v.hard() == 0) {
                hard_satisfied = true;
            }
        }
        Ok(())
    }

    /// Tries every boundary time as a start for `current`. Stops early once a
    /// candidate was scored and later starts can no longer end inside the
    /// current makespan.
    fn scan(&mut self, current: &Violator) -> Result<(), ScheduleError> {
        let max_duration = current.item().item().max_duration();
        let mut found = false;
        for start in self.plan.candidate_starts() {
            if found && self.plan.makespan() < max_duration + start {
                break;
            }
            let outcome = self
                .selector
                .try_candidate(&mut self.plan, self.tracker, start)?;
            found |= outcome.is_found();
        }
        Ok(())
    }

    fn escape(&mut self) -> Result<(), ScheduleError> {
        let Some(worst) = self.tracker.biggest_violator(None) else {
            return Ok(());
        };
        self.escapes += 1;
        self.selector.reset_plans();
        self.selector.add_plan_variant(self.plan.clone(), self.tracker);

        for (name, strategy) in ESCAPE_STRATEGIES {
            let variant = strategy(&self.plan, self.tracker, worst.id())?;
            let index = self.selector.add_plan_variant(variant, self.tracker);
            let improved = self.selector.best_plan_variant() == Some(index);
            debug!(strategy = name, worst = worst.id(), improved, "escape strategy tried");
            if improved {
                break;
            }
        }

        if self.selector.best_plan_variant() == Some(0) {
            return Err(self.failure(FailureReason::LocalOptimum { worst: worst.id() }));
        }
        let Some(plan) = self.selector.take_best_plan() else {
            return Err(self.failure(FailureReason::LocalOptimum { worst: worst.id() }));
        };
        self.tracker.plan_was_updated(&plan);
        self.plan = plan;
        debug!(makespan = self.plan.makespan(), escapes = self.escapes, "escaped local optimum");
        Ok(())
    }

    fn finish(self) -> ScheduleOutcome {
        ScheduleOutcome {
            plan: self.plan,
            backsteps: self.backsteps,
            snapshots: self.snapshots,
            iterations: self.iterations,
            escapes: self.escapes,
        }
    }
}
