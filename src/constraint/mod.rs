//! Constraint contract.
//!
//! Constraints are supplied by the caller and plug into the repair loop
//! through two capability families:
//!
//! - [`SingleItemConstraint`]: judges one placement in isolation.
//! - [`PairConstraint`]: judges two placements together, pre-filters pairs
//!   that can never interact, and predicts its own outcome as a function of
//!   the relative start offset of the two items.
//!
//! Both expose a [`refresh`](SingleItemConstraint::refresh) hook that runs
//! once before each scheduling run, before any decision is requested.
//!
//! Implementations must be deterministic for a fixed input within one run
//! and must never report negative magnitudes. [`Decision`] and
//! [`Prediction`] enforce the latter at construction.

mod library;

pub use library::{
    overlap, ConstraintType, Dependency, NoOverlap, NotBefore, StartAsap, TimeWindow, Window,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use crate::models::{Item, ScheduledItem};

// ================================
// Score
// ================================

/// Aggregated (hard, soft) violation magnitude.
///
/// Ordered lexicographically: a lower hard total always wins, soft only
/// breaks ties. "Better" means smaller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Score {
    pub hard: i64,
    pub soft: i64,
}

impl Score {
    pub const ZERO: Score = Score { hard: 0, soft: 0 };

    #[inline]
    pub const fn new(hard: i64, soft: i64) -> Self {
        Self { hard, soft }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.hard == 0 && self.soft == 0
    }

    /// Whether this score is worse than `reference`: more hard violation,
    /// or equal hard and more soft violation.
    #[inline]
    pub fn exceeds(&self, reference: &Score) -> bool {
        self > reference
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        Score::new(self.hard + rhs.hard, self.soft + rhs.soft)
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        self.hard += rhs.hard;
        self.soft += rhs.soft;
    }
}

impl Sub for Score {
    type Output = Score;

    fn sub(self, rhs: Score) -> Score {
        Score::new(self.hard - rhs.hard, self.soft - rhs.soft)
    }
}

impl Sum for Score {
    fn sum<I: Iterator<Item = Score>>(iter: I) -> Score {
        iter.fold(Score::ZERO, Add::add)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(hard {}, soft {})", self.hard, self.soft)
    }
}

// ================================
// Decision / Prediction
// ================================

/// Result of checking a constraint against concrete placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    hard: bool,
    fulfilled: bool,
    value: i64,
}

impl Decision {
    /// # Panics
    /// If `value` is negative.
    pub fn new(hard: bool, fulfilled: bool, value: i64) -> Self {
        assert!(
            value >= 0,
            "constraint reported a negative violation value ({value})"
        );
        Self {
            hard,
            fulfilled,
            value,
        }
    }

    /// A satisfied constraint.
    pub fn fulfilled(hard: bool) -> Self {
        Self::new(hard, true, 0)
    }

    /// A violated constraint with magnitude `value`.
    pub fn violated(hard: bool, value: i64) -> Self {
        Self::new(hard, false, value)
    }

    #[inline]
    pub fn is_hard(&self) -> bool {
        self.hard
    }

    #[inline]
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Contribution to a [`Score`]; zero when fulfilled.
    pub fn penalty(&self) -> Score {
        match (self.fulfilled, self.hard) {
            (true, _) => Score::ZERO,
            (false, true) => Score::new(self.value, 0),
            (false, false) => Score::new(0, self.value),
        }
    }
}

/// Directional outcome of a pairwise constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Always violated in this relative position.
    Conflict,
    /// Never violated in this relative position.
    NoConflict,
    /// May or may not be violated.
    Unknown,
}

/// Time-independent description of a pairwise constraint's outcome when the
/// moved item starts strictly before, exactly aligned with, or strictly
/// after the fixed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prediction {
    pub before: Outcome,
    pub together: Outcome,
    pub after: Outcome,
    value: i64,
}

impl Prediction {
    /// # Panics
    /// If `value` is negative.
    pub fn new(before: Outcome, together: Outcome, after: Outcome, value: i64) -> Self {
        assert!(
            value >= 0,
            "constraint predicted a negative conflict value ({value})"
        );
        Self {
            before,
            together,
            after,
            value,
        }
    }

    /// A pair that never conflicts.
    pub fn none() -> Self {
        Self::new(Outcome::NoConflict, Outcome::NoConflict, Outcome::NoConflict, 0)
    }

    /// Predicted violation magnitude.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }
}

// ================================
// Capabilities
// ================================

/// A constraint evaluated on one placement at a time.
pub trait SingleItemConstraint: Send + Sync + fmt::Debug {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Judges one placement.
    fn check(&self, item: &ScheduledItem) -> Decision;

    /// Refreshes external state. Runs once before each scheduling run.
    fn refresh(&mut self) {}
}

/// A symmetric constraint evaluated on two placements.
pub trait PairConstraint: Send + Sync + fmt::Debug {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Judges two placements. Must be symmetric.
    fn check(&self, a: &ScheduledItem, b: &ScheduledItem) -> Decision;

    /// Cheap pre-filter run once per run and pair. Pairs for which no
    /// constraint needs checking get no edge in the constraint graph.
    fn needs_checking(&self, a: &Item, b: &Item) -> bool;

    /// Outcome of placing `moved` before, aligned with, or after `fixed`.
    fn predict(&self, moved: &Item, fixed: &Item) -> Prediction;

    /// Refreshes external state. Runs once before each scheduling run.
    fn refresh(&mut self) {}
}

/// The constraints of one scheduler.
#[derive(Debug, Default)]
pub struct ConstraintSet {
    singles: Vec<Box<dyn SingleItemConstraint>>,
    pairs: Vec<Box<dyn PairConstraint>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single-item constraint.
    pub fn with_single(mut self, constraint: impl SingleItemConstraint + 'static) -> Self {
        self.singles.push(Box::new(constraint));
        self
    }

    /// Adds a pairwise constraint.
    pub fn with_pair(mut self, constraint: impl PairConstraint + 'static) -> Self {
        self.pairs.push(Box::new(constraint));
        self
    }

    pub fn push_single(&mut self, constraint: Box<dyn SingleItemConstraint>) {
        self.singles.push(constraint);
    }

    pub fn push_pair(&mut self, constraint: Box<dyn PairConstraint>) {
        self.pairs.push(constraint);
    }

    pub fn singles(&self) -> &[Box<dyn SingleItemConstraint>] {
        &self.singles
    }

    pub fn pairs(&self) -> &[Box<dyn PairConstraint>] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.pairs.is_empty()
    }

    /// Runs every constraint's refresh hook.
    pub fn refresh(&mut self) {
        for constraint in &mut self.singles {
            constraint.refresh();
        }
        for constraint in &mut self.pairs {
            constraint.refresh();
        }
    }

    /// Sum of all single-item penalties of `item`.
    pub fn check_single(&self, item: &ScheduledItem) -> Score {
        self.singles.iter().map(|c| c.check(item).penalty()).sum()
    }
}
