//! Configuration selection.
//!
//! Two independent bookkeeping jobs:
//!
//! - **Moves.** For the current worst violator, scores candidate start
//!   times against a fixed reference (its placement when the scan began)
//!   and keeps the single best eligible move.
//! - **Plan variants.** During escape, ranks whole alternative plans and
//!   keeps the best one.
//!
//! # Ranking
//!
//! | Job | Eligible | Ranked by |
//! |-----|----------|-----------|
//! | move | score strictly below the reference | makespan, hard, soft, duration summary |
//! | plan variant | always | total hard, makespan, total soft |

use tracing::trace;

use crate::constraint::Score;
use crate::error::ScheduleError;
use crate::models::{Plan, ScheduledItem};
use crate::tracker::{ViolationTracker, Violator, ViolatorUpdate};

/// What [`ConfigurationSelector::try_candidate`] made of one start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// The start equals the reference start; nothing was tried.
    Skipped,
    /// The tracker rejected the placement as worse than the reference.
    Rejected,
    /// Fully scored but not better than the best candidate so far (or not
    /// strictly better than the reference).
    Evaluated,
    /// Fully scored and now the best candidate.
    Improved,
}

impl CandidateOutcome {
    /// Whether the candidate was scored in full.
    pub fn is_found(self) -> bool {
        matches!(self, Self::Evaluated | Self::Improved)
    }
}

/// Ranking key of a move: (makespan, hard, soft, duration summary).
type MoveRank = (i64, i64, i64, i64);

#[derive(Debug)]
struct Candidate {
    update: ViolatorUpdate,
    rank: MoveRank,
}

/// Ranking key of a whole plan. Ordered by hard total, then makespan,
/// then soft total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlanRank {
    pub hard: i64,
    pub makespan: i64,
    pub soft: i64,
}

impl PlanRank {
    pub fn new(score: Score, makespan: i64) -> Self {
        Self {
            hard: score.hard,
            makespan,
            soft: score.soft,
        }
    }
}

/// Best-move and best-plan tracking for the repair loop.
#[derive(Debug, Default)]
pub struct ConfigurationSelector {
    reference: Option<Violator>,
    reference_makespan: i64,
    best: Option<Candidate>,
    variants: Vec<(Plan, PlanRank)>,
    best_variant: Option<usize>,
}

impl ConfigurationSelector {
    pub fn new() -> Self {
        Self::default()
    }

    // ================================
    // Moves
    // ================================

    /// Starts a new scan for `violator`, recording its current placement and
    /// the plan's makespan as the reference.
    pub fn reset_for(&mut self, violator: &Violator, plan: &Plan) {
        self.reference = Some(violator.clone());
        self.reference_makespan = plan.makespan();
        self.best = None;
    }

    /// The violator the current scan started from.
    pub fn reference(&self) -> Option<&Violator> {
        self.reference.as_ref()
    }

    pub fn reference_makespan(&self) -> i64 {
        self.reference_makespan
    }

    /// Moves the reference item to `start` in `plan` and scores it.
    ///
    /// The move is left in place whatever the outcome; callers restore the
    /// reference with [`apply_reference`](Self::apply_reference) or commit
    /// with [`apply_best`](Self::apply_best).
    pub fn try_candidate(
        &mut self,
        plan: &mut Plan,
        tracker: &mut ViolationTracker,
        start: i64,
    ) -> Result<CandidateOutcome, ScheduleError> {
        let Some(reference) = &self.reference else {
            return Ok(CandidateOutcome::Skipped);
        };
        if reference.item().start() == start {
            return Ok(CandidateOutcome::Skipped);
        }
        let reference_score = reference.score();

        let moved = plan.move_item(reference.id(), start)?;
        let Ok(update) = tracker.try_violator_update(&moved, plan) else {
            trace!(item = moved.id(), start, "candidate rejected");
            return Ok(CandidateOutcome::Rejected);
        };

        let score = update.violator().score();
        if score >= reference_score {
            trace!(item = moved.id(), start, %score, "candidate not better than reference");
            return Ok(CandidateOutcome::Evaluated);
        }

        let rank = (
            plan.makespan(),
            score.hard,
            score.soft,
            moved.item().duration_summary(),
        );
        let improves = self.best.as_ref().map_or(true, |best| rank < best.rank);
        trace!(item = moved.id(), start, %score, makespan = rank.0, improves, "candidate scored");
        if improves {
            self.best = Some(Candidate { update, rank });
            Ok(CandidateOutcome::Improved)
        } else {
            Ok(CandidateOutcome::Evaluated)
        }
    }

    /// Placement of the best candidate, or the reference placement if no
    /// candidate was eligible.
    pub fn best_item(&self) -> Option<&ScheduledItem> {
        match &self.best {
            Some(best) => Some(best.update.violator().item()),
            None => self.reference.as_ref().map(Violator::item),
        }
    }

    /// Commits the best candidate to `plan` and `tracker`.
    ///
    /// Returns `false` if no candidate was strictly better than the
    /// reference.
    pub fn apply_best(
        &mut self,
        plan: &mut Plan,
        tracker: &mut ViolationTracker,
    ) -> Result<bool, ScheduleError> {
        let Some(best) = self.best.take() else {
            return Ok(false);
        };
        let item = best.update.violator().item();
        plan.move_item(item.id(), item.start())?;
        tracker.update_violator(best.update);
        Ok(true)
    }

    /// Puts the reference item back at its reference start.
    pub fn apply_reference(&self, plan: &mut Plan) -> Result<(), ScheduleError> {
        if let Some(reference) = &self.reference {
            plan.move_item(reference.id(), reference.item().start())?;
        }
        Ok(())
    }

    // ================================
    // Plan variants
    // ================================

    pub fn reset_plans(&mut self) {
        self.variants.clear();
        self.best_variant = None;
    }

    /// Scores `plan` in full and records it. Returns the variant's index.
    ///
    /// A variant only becomes the best when it ranks strictly better than
    /// the current best, so the first of equally ranked variants wins.
    pub fn add_plan_variant(&mut self, plan: Plan, tracker: &ViolationTracker) -> usize {
        let rank = PlanRank::new(tracker.check_violations_for_plan(&plan), plan.makespan());
        let index = self.variants.len();
        self.variants.push((plan, rank));

        let improves = self
            .best_variant
            .map_or(true, |best| rank < self.variants[best].1);
        if improves {
            self.best_variant = Some(index);
        }
        index
    }

    /// Index of the best variant recorded since the last reset.
    pub fn best_plan_variant(&self) -> Option<usize> {
        self.best_variant
    }

    pub fn plan_rank(&self, index: usize) -> Option<PlanRank> {
        self.variants.get(index).map(|(_, rank)| *rank)
    }

    /// Removes and returns the best variant, clearing all variants.
    pub fn take_best_plan(&mut self) -> Option<Plan> {
        let best = self.best_variant.take()?;
        let plan = self.variants.swap_remove(best).0;
        self.variants.clear();
        Some(plan)
    }
}
