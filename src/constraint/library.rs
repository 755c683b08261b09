//! Reference constraint implementations.
//!
//! | Constraint | Kind | Hard | Violation value |
//! |-----------|------|------|-----------------|
//! | [`NoOverlap`] | pair | yes | summed overlap on shared lanes |
//! | [`Dependency`] | pair | yes | larger duration summary of the two |
//! | [`StartAsap`] | single | no | start + duration summary |
//! | [`TimeWindow`] | single | configurable | earliness + lateness |
//! | [`NotBefore`] | single | yes | time before the refreshed clock |
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{Decision, Outcome, PairConstraint, Prediction, SingleItemConstraint};
use crate::models::{Item, ItemId, ScheduledItem};

/// Length of the intersection of `[start1, end1)` and `[start2, end2)`.
#[inline]
pub fn overlap(start1: i64, end1: i64, start2: i64, end2: i64) -> i64 {
    (end1.min(end2) - start1.max(start2)).max(0)
}

// ================================
// NoOverlap
// ================================

/// Items sharing a lane may not run on it at the same time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverlap;

impl NoOverlap {
    pub fn new() -> Self {
        Self
    }
}

impl PairConstraint for NoOverlap {
    fn name(&self) -> &str {
        "no-overlap"
    }

    fn check(&self, a: &ScheduledItem, b: &ScheduledItem) -> Decision {
        let total: i64 = a
            .item()
            .shared_lanes(b.item())
            .map(|(_, da, db)| overlap(a.start(), a.start() + da, b.start(), b.start() + db))
            .sum();
        if total > 0 {
            Decision::violated(true, total)
        } else {
            Decision::fulfilled(true)
        }
    }

    fn needs_checking(&self, a: &Item, b: &Item) -> bool {
        a.shares_lane(b)
    }

    fn predict(&self, moved: &Item, fixed: &Item) -> Prediction {
        let aligned: i64 = moved
            .shared_lanes(fixed)
            .map(|(_, dm, df)| dm.min(df))
            .sum();
        if aligned == 0 {
            return Prediction::none();
        }
        Prediction::new(
            Outcome::NoConflict,
            Outcome::Conflict,
            Outcome::NoConflict,
            aligned,
        )
    }
}

// ================================
// Dependency
// ================================

/// An item may not start before every item it requires has ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dependency;

impl Dependency {
    pub fn new() -> Self {
        Self
    }

    fn starts_too_early(dependent: &ScheduledItem, required: &ScheduledItem) -> bool {
        dependent.item().requires(required.id()) && dependent.start() < required.max_end()
    }
}

impl PairConstraint for Dependency {
    fn name(&self) -> &str {
        "dependency"
    }

    fn check(&self, a: &ScheduledItem, b: &ScheduledItem) -> Decision {
        if Self::starts_too_early(a, b) || Self::starts_too_early(b, a) {
            let value = a.item().duration_summary().max(b.item().duration_summary());
            Decision::violated(true, value)
        } else {
            Decision::fulfilled(true)
        }
    }

    fn needs_checking(&self, a: &Item, b: &Item) -> bool {
        a.requires(b.id()) || b.requires(a.id())
    }

    fn predict(&self, moved: &Item, fixed: &Item) -> Prediction {
        let value = moved.duration_summary().max(fixed.duration_summary());
        match (moved.requires(fixed.id()), fixed.requires(moved.id())) {
            (true, true) => Prediction::new(
                Outcome::Conflict,
                Outcome::Conflict,
                Outcome::Conflict,
                value,
            ),
            (true, false) => Prediction::new(
                Outcome::Conflict,
                Outcome::Conflict,
                Outcome::NoConflict,
                value,
            ),
            (false, true) => Prediction::new(
                Outcome::NoConflict,
                Outcome::Conflict,
                Outcome::Conflict,
                value,
            ),
            (false, false) => Prediction::none(),
        }
    }
}

// ================================
// StartAsap
// ================================

/// Soft preference for starting at time zero.
///
/// Penalizes `start + duration summary`, so larger and later items weigh
/// more. This is what pulls items towards the front of the plan and drives
/// makespan down once hard constraints hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartAsap;

impl StartAsap {
    pub fn new() -> Self {
        Self
    }
}

impl SingleItemConstraint for StartAsap {
    fn name(&self) -> &str {
        "start-asap"
    }

    fn check(&self, item: &ScheduledItem) -> Decision {
        if item.start() == 0 {
            Decision::fulfilled(false)
        } else {
            Decision::violated(false, item.start().abs() + item.item().duration_summary())
        }
    }
}

// ================================
// TimeWindow
// ================================

/// Hard or soft classification of a time window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConstraintType {
    /// Must be satisfied.
    Hard,
    /// Penalized when violated.
    #[default]
    Soft,
}

/// Earliest start and latest end of one item.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Window {
    /// Release time: the item may not start earlier.
    pub earliest_start: Option<i64>,
    /// Due date: the item's latest lane end may not exceed it.
    pub latest_end: Option<i64>,
}

impl Window {
    /// Time units outside the window for a placement.
    pub fn violation(&self, item: &ScheduledItem) -> i64 {
        let early = self
            .earliest_start
            .map_or(0, |release| (release - item.start()).max(0));
        let late = self
            .latest_end
            .map_or(0, |due| (item.max_end() - due).max(0));
        early + late
    }
}

/// Per-item release times and due dates.
///
/// # Examples
///
/// ```
/// use u_repair::constraint::{SingleItemConstraint, TimeWindow};
/// use u_repair::models::{Item, Lane, ScheduledItem};
///
/// let windows = TimeWindow::hard().with_deadline(1, 100);
/// let item = Item::on_lane(1, Lane::new(0), 40).unwrap();
///
/// assert!(windows.check(&ScheduledItem::new(item.clone(), 60)).is_fulfilled());
/// assert_eq!(windows.check(&ScheduledItem::new(item, 70)).value(), 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    windows: BTreeMap<ItemId, Window>,
    constraint_type: ConstraintType,
}

impl TimeWindow {
    /// Windows that must hold.
    pub fn hard() -> Self {
        Self {
            windows: BTreeMap::new(),
            constraint_type: ConstraintType::Hard,
        }
    }

    /// Windows that are penalized per time unit of violation.
    pub fn soft() -> Self {
        Self::default()
    }

    /// Sets a release time for `id`.
    pub fn with_release(mut self, id: ItemId, earliest_start: i64) -> Self {
        self.windows.entry(id).or_default().earliest_start = Some(earliest_start);
        self
    }

    /// Sets a due date for `id`.
    pub fn with_deadline(mut self, id: ItemId, latest_end: i64) -> Self {
        self.windows.entry(id).or_default().latest_end = Some(latest_end);
        self
    }

    /// Sets both bounds for `id`.
    pub fn with_window(self, id: ItemId, earliest_start: i64, latest_end: i64) -> Self {
        self.with_release(id, earliest_start)
            .with_deadline(id, latest_end)
    }

    pub fn window(&self, id: ItemId) -> Option<&Window> {
        self.windows.get(&id)
    }

    fn is_hard(&self) -> bool {
        self.constraint_type == ConstraintType::Hard
    }
}

impl SingleItemConstraint for TimeWindow {
    fn name(&self) -> &str {
        "time-window"
    }

    fn check(&self, item: &ScheduledItem) -> Decision {
        let violation = self
            .windows
            .get(&item.id())
            .map_or(0, |window| window.violation(item));
        if violation > 0 {
            Decision::violated(self.is_hard(), violation)
        } else {
            Decision::fulfilled(self.is_hard())
        }
    }
}

// ================================
// NotBefore
// ================================

/// Nothing may start before "now", where now is read from a clock once per
/// scheduling run.
pub struct NotBefore {
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
    now: i64,
}

impl NotBefore {
    pub fn new(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        let now = clock();
        Self {
            clock: Box::new(clock),
            now,
        }
    }

    /// Clock value read at the last refresh.
    pub fn now(&self) -> i64 {
        self.now
    }
}

impl fmt::Debug for NotBefore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotBefore").field("now", &self.now).finish()
    }
}

impl SingleItemConstraint for NotBefore {
    fn name(&self) -> &str {
        "not-before"
    }

    fn check(&self, item: &ScheduledItem) -> Decision {
        if item.start() < self.now {
            Decision::violated(true, self.now - item.start())
        } else {
            Decision::fulfilled(true)
        }
    }

    fn refresh(&mut self) {
        self.now = (self.clock)();
    }
}
