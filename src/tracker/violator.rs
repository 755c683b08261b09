//! Violator values and the scoring functions that produce them.

use std::cmp::Ordering;

use super::graph::{ConstraintGraph, PairLink};
use crate::constraint::{ConstraintSet, Score};
use crate::models::{ItemId, ScheduledItem};

/// A scored view of one movable placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violator {
    item: ScheduledItem,
    score: Score,
}

impl Violator {
    pub fn new(item: ScheduledItem, score: Score) -> Self {
        Self { item, score }
    }

    #[inline]
    pub fn id(&self) -> ItemId {
        self.item.id()
    }

    #[inline]
    pub fn item(&self) -> &ScheduledItem {
        &self.item
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    #[inline]
    pub fn hard(&self) -> i64 {
        self.score.hard
    }

    #[inline]
    pub fn soft(&self) -> i64 {
        self.score.soft
    }

    pub(crate) fn severity_key(&self) -> SeverityKey {
        SeverityKey {
            score: self.score,
            summary: self.item.item().duration_summary(),
            id: self.id(),
        }
    }
}

/// Index key ordering violators worst first: hard desc, soft desc,
/// duration summary desc, id asc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SeverityKey {
    score: Score,
    summary: i64,
    id: ItemId,
}

impl SeverityKey {
    pub(crate) fn is_zero(&self) -> bool {
        self.score.is_zero()
    }
}

impl Ord for SeverityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .hard
            .cmp(&self.score.hard)
            .then_with(|| other.score.soft.cmp(&self.score.soft))
            .then_with(|| other.summary.cmp(&self.summary))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for SeverityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending change to one partner of a moved item.
#[derive(Debug, Clone)]
pub(crate) struct PartnerUpdate {
    pub(crate) pair: usize,
    pub(crate) score: Score,
    /// New violator of the partner, unless the partner is fixed.
    pub(crate) violator: Option<(usize, Violator)>,
}

/// Speculatively computed result of moving one item. Committed with
/// [`ViolationTracker::update_violator`](super::ViolationTracker::update_violator).
#[derive(Debug, Clone)]
pub struct ViolatorUpdate {
    pub(crate) node: usize,
    pub(crate) violator: Violator,
    pub(crate) partners: Vec<PartnerUpdate>,
}

impl ViolatorUpdate {
    /// The moved item's violator after the move.
    pub fn violator(&self) -> &Violator {
        &self.violator
    }

    /// Number of partner entries the commit will touch.
    pub fn partner_count(&self) -> usize {
        self.partners.len()
    }
}

/// Sum of every pair constraint penalty between `a` and `b`.
pub(crate) fn score_pair(
    a: &ScheduledItem,
    b: &ScheduledItem,
    pair: &PairLink,
    constraints: &ConstraintSet,
) -> Score {
    pair.constraints
        .iter()
        .map(|&c| constraints.pairs()[c].check(a, b).penalty())
        .sum()
}

/// Single-item penalties plus the stored pair totals of every partner.
pub(crate) fn score_from_tables(
    item: &ScheduledItem,
    node: usize,
    graph: &ConstraintGraph,
    constraints: &ConstraintSet,
    pair_scores: &[Score],
) -> Score {
    let pairs: Score = graph
        .partners(node)
        .iter()
        .map(|link| pair_scores[link.pair])
        .sum();
    constraints.check_single(item) + pairs
}
