//! Conflict predictor.
//!
//! For every item, the predictor keeps one aggregate curve giving, as a
//! function of the item's start time, the hard conflict it will certainly
//! incur (`definite`) and may incur (`possible`) against its current
//! partners. The tracker uses the definite part as a lower bound to reject
//! candidate placements before scoring them in full.
//!
//! # Construction
//!
//! Each (item, partner) edge gets a pair curve built from every applicable
//! constraint's [`Prediction`](crate::constraint::Prediction), combined by
//! pointwise maximum. Pair curves depend only on the two duration profiles
//! and the predictions, so identical shapes are built once and shared.
//!
//! # Aggregation
//!
//! An item's aggregate is the pointwise sum of its partners' pair curves,
//! each anchored at the partner's start. Moves only mark curves dirty; the
//! aggregate is refreshed lazily on the next query. When fewer than half of
//! the partners are dirty, their old contributions are subtracted and the
//! re-anchored ones added; otherwise the aggregate is rebuilt.

mod block;
mod curve;
mod pool;

pub use block::ConflictEstimate;
pub use pool::{MergePool, DEFAULT_PARALLEL_THRESHOLD};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::trace;

use self::block::{BlockStore, Merge};
use self::curve::Curve;
use crate::constraint::{ConstraintSet, Prediction};
use crate::models::{ItemId, Plan, ScheduledItem};
use crate::tracker::ConstraintGraph;

#[derive(Debug, Clone)]
struct PartnerCurve {
    node: usize,
    curve: Curve,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    partners: Vec<PartnerCurve>,
    /// Slots in `partners` whose anchor is stale.
    dirty: BTreeSet<usize>,
    aggregate: Option<Curve>,
}

/// Per-item aggregate conflict curves over the constraint graph.
#[derive(Debug)]
pub struct Predictor {
    ids: Vec<ItemId>,
    lookup: HashMap<ItemId, usize>,
    entries: Vec<Entry>,
    /// For each node: `(partner node, slot of this node in the partner's entry)`.
    back_links: Vec<Vec<(usize, usize)>>,
    store: Arc<BlockStore>,
    pool: MergePool,
}

impl Default for Predictor {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            lookup: HashMap::new(),
            entries: Vec::new(),
            back_links: Vec::new(),
            store: Arc::new(BlockStore::new()),
            pool: MergePool::default(),
        }
    }
}

impl Predictor {
    /// Builds pair curves for every edge of `graph`. Aggregates are left
    /// empty and built on first query.
    pub(crate) fn build(graph: &ConstraintGraph, constraints: &ConstraintSet, pool: MergePool) -> Self {
        let store = Arc::new(BlockStore::new());
        let mut shapes: HashMap<(Vec<Prediction>, i64, i64), Curve> = HashMap::new();

        let mut entries = Vec::with_capacity(graph.len());
        for node in 0..graph.len() {
            let moved = graph.item(node);
            let partners = graph
                .partners(node)
                .iter()
                .map(|link| {
                    let fixed = graph.item(link.node);
                    let predictions: Vec<Prediction> = graph
                        .pair(link.pair)
                        .constraints
                        .iter()
                        .map(|&c| constraints.pairs()[c].predict(moved, fixed))
                        .collect();
                    let key = (predictions, moved.max_duration(), fixed.max_duration());
                    let curve = match shapes.get(&key) {
                        Some(curve) => curve.clone(),
                        None => {
                            let curve = Curve::for_predictions(&key.0, key.1, key.2, &store, &pool);
                            shapes.insert(key, curve.clone());
                            curve
                        }
                    };
                    PartnerCurve {
                        node: link.node,
                        curve,
                    }
                })
                .collect();
            entries.push(Entry {
                partners,
                ..Entry::default()
            });
        }

        let mut back_links = vec![Vec::new(); graph.len()];
        for (node, entry) in entries.iter().enumerate() {
            for (slot, partner) in entry.partners.iter().enumerate() {
                back_links[partner.node].push((node, slot));
            }
        }

        let ids: Vec<ItemId> = (0..graph.len()).map(|node| graph.id(node)).collect();
        let lookup = ids.iter().enumerate().map(|(node, &id)| (id, node)).collect();

        Self {
            ids,
            lookup,
            entries,
            back_links,
            store,
            pool,
        }
    }

    /// Conflict estimate for `item` at its start, against the partners'
    /// positions in `plan`. Items unknown to the predictor estimate zero.
    pub fn predict_conflicts(&mut self, item: &ScheduledItem, plan: &Plan) -> ConflictEstimate {
        let Some(&node) = self.lookup.get(&item.id()) else {
            return ConflictEstimate::ZERO;
        };
        self.refresh(node, plan);
        self.entries[node]
            .aggregate
            .as_ref()
            .map_or(ConflictEstimate::ZERO, |curve| curve.value_at(item.start()))
    }

    /// Marks the item's position stale in every partner's aggregate.
    pub fn item_was_moved(&mut self, id: ItemId) {
        let Some(&node) = self.lookup.get(&id) else {
            return;
        };
        for &(partner, slot) in &self.back_links[node] {
            self.entries[partner].dirty.insert(slot);
        }
    }

    /// Invalidates every aggregate after the plan was replaced wholesale.
    pub fn plan_was_updated(&mut self) {
        for entry in &mut self.entries {
            entry.dirty.clear();
            entry.aggregate = None;
        }
    }

    /// Number of distinct interned blocks.
    pub fn block_count(&self) -> usize {
        self.store.len()
    }

    /// Segments in the item's current aggregate, if built.
    pub fn segment_count(&self, id: ItemId) -> Option<usize> {
        let node = *self.lookup.get(&id)?;
        self.entries[node].aggregate.as_ref().map(Curve::segment_count)
    }

    fn refresh(&mut self, node: usize, plan: &Plan) {
        let Self {
            ids,
            entries,
            store,
            pool,
            ..
        } = self;
        let entry = &mut entries[node];
        if entry.aggregate.is_some() && entry.dirty.is_empty() {
            return;
        }
        let position = |partner: &PartnerCurve| {
            plan.get(ids[partner.node])
                .map_or(partner.curve.anchor(), ScheduledItem::start)
        };

        let incremental = entry.dirty.len() < entry.partners.len() / 2;
        match entry.aggregate.take().filter(|_| incremental) {
            Some(aggregate) => {
                let dirty: Vec<usize> = std::mem::take(&mut entry.dirty).into_iter().collect();
                trace!(item = ids[node], dirty = dirty.len(), "incremental re-aggregation");

                let stale: Vec<&Curve> = dirty.iter().map(|&s| &entry.partners[s].curve).collect();
                let reduced = aggregate.merge(&stale, Merge::Subtract, store, pool);

                for &slot in &dirty {
                    let anchor = position(&entry.partners[slot]);
                    entry.partners[slot].curve.set_anchor(anchor);
                }
                let fresh: Vec<&Curve> = dirty.iter().map(|&s| &entry.partners[s].curve).collect();
                entry.aggregate = Some(reduced.merge(&fresh, Merge::Add, store, pool));
            }
            None => {
                trace!(item = ids[node], partners = entry.partners.len(), "rebuilding aggregate");
                entry.dirty.clear();
                for slot in 0..entry.partners.len() {
                    let anchor = position(&entry.partners[slot]);
                    entry.partners[slot].curve.set_anchor(anchor);
                }
                let all: Vec<&Curve> = entry.partners.iter().map(|p| &p.curve).collect();
                entry.aggregate = Some(Curve::empty(store).merge(&all, Merge::Add, store, pool));
            }
        }
    }
}
