//! Incremental violation tracking.
//!
//! The tracker owns the constraints, the sparse constraint graph of one run
//! and, for every movable item, a running (hard, soft) score: its single-item
//! penalties plus the totals of every pair it belongs to. Pair totals are
//! stored once per pair and shared by both endpoints.
//!
//! Movable items are kept in a severity index (a `BTreeMap`), so the worst
//! offender and the next-worse offender below a bound are O(log n).
//!
//! # Speculative updates
//!
//! [`ViolationTracker::try_violator_update`] scores a candidate placement
//! without touching the index and bails out with [`UpdateRejected`] as soon
//! as the running total is provably worse than the item's current score.
//! The predictor's definite conflict estimate tightens that bound before any
//! pair is checked. [`ViolationTracker::update_violator`] commits.

mod graph;
mod violator;

pub(crate) use graph::ConstraintGraph;
pub use violator::{Violator, ViolatorUpdate};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use tracing::{debug, trace};

use self::violator::{score_from_tables, score_pair, PartnerUpdate, SeverityKey};
use crate::constraint::{ConstraintSet, Score};
use crate::error::UpdateRejected;
use crate::models::{ItemId, Plan, ScheduledItem};
use crate::predictor::{MergePool, Predictor};

/// Violation bookkeeping for one scheduling run.
#[derive(Debug)]
pub struct ViolationTracker {
    constraints: ConstraintSet,
    use_prediction: bool,
    pool: MergePool,
    graph: ConstraintGraph,
    /// Current total of every pair, indexed like `graph.pairs()`.
    pair_scores: Vec<Score>,
    /// Current violator of every node; `None` for fixed or absent items.
    violators: Vec<Option<Violator>>,
    index: BTreeMap<SeverityKey, usize>,
    predictor: Predictor,
}

impl ViolationTracker {
    /// Creates a tracker over `constraints`. Call
    /// [`initialize`](Self::initialize) before use.
    pub fn new(constraints: ConstraintSet) -> Self {
        Self {
            constraints,
            use_prediction: true,
            pool: MergePool::default(),
            graph: ConstraintGraph::default(),
            pair_scores: Vec::new(),
            violators: Vec::new(),
            index: BTreeMap::new(),
            predictor: Predictor::default(),
        }
    }

    /// Enables or disables the predictor bound in speculative updates.
    pub fn with_prediction(mut self, use_prediction: bool) -> Self {
        self.use_prediction = use_prediction;
        self
    }

    /// Sets the pool used for curve merges.
    pub fn with_merge_pool(mut self, pool: MergePool) -> Self {
        self.pool = pool;
        self
    }

    pub(crate) fn set_prediction(&mut self, use_prediction: bool) {
        self.use_prediction = use_prediction;
    }

    pub(crate) fn set_merge_pool(&mut self, pool: MergePool) {
        self.pool = pool;
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Number of item pairs with at least one applicable pair constraint.
    pub fn pair_count(&self) -> usize {
        self.graph.pair_count()
    }

    /// Refreshes the constraints, builds the constraint graph over `plan`,
    /// scores every item and pair, and rebuilds the predictor.
    pub fn initialize(&mut self, plan: &Plan) {
        self.constraints.refresh();
        self.graph = ConstraintGraph::build(plan, &self.constraints);
        self.rescore(plan);
        self.predictor = Predictor::build(&self.graph, &self.constraints, self.pool.clone());
        debug!(
            items = self.graph.len(),
            pairs = self.graph.pair_count(),
            violators = self.index.len(),
            "violation tracker initialized"
        );
    }

    /// Rescores pairs and violators from `plan` over the existing graph.
    fn rescore(&mut self, plan: &Plan) {
        self.pair_scores = self
            .graph
            .pairs()
            .iter()
            .map(|pair| {
                let a = plan.get(self.graph.id(pair.a));
                let b = plan.get(self.graph.id(pair.b));
                match (a, b) {
                    (Some(a), Some(b)) => score_pair(a, b, pair, &self.constraints),
                    _ => Score::ZERO,
                }
            })
            .collect();

        self.index.clear();
        self.violators = vec![None; self.graph.len()];
        for node in 0..self.graph.len() {
            let id = self.graph.id(node);
            let Some(scheduled) = plan.get(id) else {
                continue;
            };
            if plan.is_fixed(id) {
                continue;
            }
            let score = score_from_tables(
                scheduled,
                node,
                &self.graph,
                &self.constraints,
                &self.pair_scores,
            );
            self.replace(node, Violator::new(scheduled.clone(), score));
        }
    }

    /// Worst violator strictly less severe than `upper`, or the worst
    /// overall without a bound. `None` once only violation-free items remain.
    pub fn biggest_violator(&self, upper: Option<&Violator>) -> Option<Violator> {
        let next = match upper {
            None => self.index.iter().next(),
            Some(bound) => self
                .index
                .range((Bound::Excluded(bound.severity_key()), Bound::Unbounded))
                .next(),
        };
        let (key, &node) = next?;
        if key.is_zero() {
            return None;
        }
        self.violators[node].clone()
    }

    /// Current violator of `id`, if it is tracked (placed and movable).
    pub fn violator(&self, id: ItemId) -> Option<&Violator> {
        let node = self.graph.node(id)?;
        self.violators[node].as_ref()
    }

    /// Tracked violators, worst first.
    pub fn violators(&self) -> impl Iterator<Item = &Violator> {
        self.index
            .values()
            .filter_map(move |&node| self.violators[node].as_ref())
    }

    /// Sum of every tracked violator's score.
    pub fn total_score(&self) -> Score {
        self.violators().map(Violator::score).sum()
    }

    /// Scores `candidate` as if it replaced the item's current placement.
    ///
    /// `plan` must hold every partner at its committed position. The index
    /// is not modified.
    ///
    /// # Errors
    /// [`UpdateRejected`] as soon as the running score exceeds the item's
    /// current score, or when the item is not tracked.
    pub fn try_violator_update(
        &mut self,
        candidate: &ScheduledItem,
        plan: &Plan,
    ) -> Result<ViolatorUpdate, UpdateRejected> {
        let node = self.graph.node(candidate.id()).ok_or(UpdateRejected)?;
        let reference = self.violators[node]
            .as_ref()
            .ok_or(UpdateRejected)?
            .score();

        let mut score = Score::ZERO;
        for constraint in self.constraints.singles() {
            score += constraint.check(candidate).penalty();
            if score.exceeds(&reference) {
                return Err(UpdateRejected);
            }
        }

        if self.use_prediction {
            let estimate = self.predictor.predict_conflicts(candidate, plan);
            let bound = Score::new(score.hard + estimate.definite, score.soft);
            if bound.exceeds(&reference) {
                trace!(
                    item = candidate.id(),
                    start = candidate.start(),
                    definite = estimate.definite,
                    "candidate pruned by prediction"
                );
                return Err(UpdateRejected);
            }
        }

        let mut partners = Vec::with_capacity(self.graph.partners(node).len());
        for link in self.graph.partners(node) {
            let Some(partner) = plan.get(self.graph.id(link.node)) else {
                continue;
            };
            let pair = self.graph.pair(link.pair);
            let mut pair_score = Score::ZERO;
            for &c in &pair.constraints {
                let decision = self.constraints.pairs()[c].check(candidate, partner);
                if decision.is_fulfilled() {
                    continue;
                }
                pair_score += decision.penalty();
                score += decision.penalty();
                if score.exceeds(&reference) {
                    return Err(UpdateRejected);
                }
            }

            let violator = self.violators[link.node].as_ref().map(|old| {
                let updated = old.score() + pair_score - self.pair_scores[link.pair];
                (link.node, Violator::new(partner.clone(), updated))
            });
            partners.push(PartnerUpdate {
                pair: link.pair,
                score: pair_score,
                violator,
            });
        }

        Ok(ViolatorUpdate {
            node,
            violator: Violator::new(candidate.clone(), score),
            partners,
        })
    }

    /// Commits a speculative update: pair totals, partner entries and the
    /// moved item's entry are replaced, and the predictor learns of the move.
    pub fn update_violator(&mut self, update: ViolatorUpdate) {
        let ViolatorUpdate {
            node,
            violator,
            partners,
        } = update;
        for partner in partners {
            self.pair_scores[partner.pair] = partner.score;
            if let Some((partner_node, partner_violator)) = partner.violator {
                self.replace(partner_node, partner_violator);
            }
        }
        let id = violator.id();
        self.replace(node, violator);
        self.predictor.item_was_moved(id);
    }

    fn replace(&mut self, node: usize, violator: Violator) {
        if let Some(old) = self.violators[node].take() {
            self.index.remove(&old.severity_key());
        }
        self.index.insert(violator.severity_key(), node);
        self.violators[node] = Some(violator);
    }

    /// Full score of `item` against the plan: single-item penalties plus
    /// every pair with a partner currently in `plan`.
    pub fn check_violations_for_item(&self, item: &ScheduledItem, plan: &Plan) -> Score {
        let mut score = self.constraints.check_single(item);
        let Some(node) = self.graph.node(item.id()) else {
            return score;
        };
        for link in self.graph.partners(node) {
            if let Some(partner) = plan.get(self.graph.id(link.node)) {
                score += score_pair(item, partner, self.graph.pair(link.pair), &self.constraints);
            }
        }
        score
    }

    /// Sum of [`check_violations_for_item`](Self::check_violations_for_item)
    /// over every placement. Each pair is counted once per endpoint.
    pub fn check_violations_for_plan(&self, plan: &Plan) -> Score {
        plan.items()
            .map(|item| self.check_violations_for_item(item, plan))
            .sum()
    }

    /// Partners of `item` currently in hard conflict with it.
    pub fn hard_violated_items(&self, item: &ScheduledItem, plan: &Plan) -> Vec<ScheduledItem> {
        let Some(node) = self.graph.node(item.id()) else {
            return Vec::new();
        };
        self.graph
            .partners(node)
            .iter()
            .filter_map(|link| {
                let partner = plan.get(self.graph.id(link.node))?;
                let violated = self.graph.pair(link.pair).constraints.iter().any(|&c| {
                    let decision = self.constraints.pairs()[c].check(item, partner);
                    decision.is_hard() && !decision.is_fulfilled()
                });
                violated.then(|| partner.clone())
            })
            .collect()
    }

    /// Fixed items that violate hard constraints on their own or against
    /// other fixed items. No move can repair these.
    pub fn fixed_conflicts(&self, plan: &Plan) -> Vec<ItemId> {
        let mut conflicting = BTreeSet::new();
        for id in plan.fixed_ids() {
            let Some(item) = plan.get(id) else {
                continue;
            };
            if self.constraints.check_single(item).hard > 0 {
                conflicting.insert(id);
            }
        }
        for (idx, pair) in self.graph.pairs().iter().enumerate() {
            let (a, b) = (self.graph.id(pair.a), self.graph.id(pair.b));
            if plan.is_fixed(a) && plan.is_fixed(b) && self.pair_scores[idx].hard > 0 {
                conflicting.insert(a);
                conflicting.insert(b);
            }
        }
        conflicting.into_iter().collect()
    }

    /// Rescores everything after the plan was replaced wholesale.
    pub fn plan_was_updated(&mut self, plan: &Plan) {
        self.rescore(plan);
        self.predictor.plan_was_updated();
        debug!(violators = self.index.len(), "violation tracker rescored");
    }
}
