//! Sparse constraint graph.
//!
//! Nodes are the items of one run, addressed by dense indices. An edge
//! (pair) exists between two items when at least one pairwise constraint
//! needs checking for them; the edge lists those constraints by index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::constraint::ConstraintSet;
use crate::models::{Item, ItemId, Plan};

/// A neighbour of a node and the pair linking them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PartnerLink {
    pub(crate) node: usize,
    pub(crate) pair: usize,
}

/// An unordered item pair and the pair constraints that apply to it.
#[derive(Debug, Clone)]
pub(crate) struct PairLink {
    pub(crate) a: usize,
    pub(crate) b: usize,
    pub(crate) constraints: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ConstraintGraph {
    items: Vec<Arc<Item>>,
    lookup: HashMap<ItemId, usize>,
    partners: Vec<Vec<PartnerLink>>,
    pairs: Vec<PairLink>,
}

impl ConstraintGraph {
    /// Builds the graph over every item in `plan`, in ascending id order.
    ///
    /// O(n² · c) calls to `needs_checking`.
    pub(crate) fn build(plan: &Plan, constraints: &ConstraintSet) -> Self {
        let items: Vec<Arc<Item>> = plan.items().map(|s| Arc::clone(s.item_arc())).collect();
        let lookup = items
            .iter()
            .enumerate()
            .map(|(node, item)| (item.id(), node))
            .collect();

        let mut partners = vec![Vec::new(); items.len()];
        let mut pairs = Vec::new();
        for a in 0..items.len() {
            for b in (a + 1)..items.len() {
                let applicable: Vec<usize> = constraints
                    .pairs()
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.needs_checking(&items[a], &items[b]))
                    .map(|(idx, _)| idx)
                    .collect();
                if applicable.is_empty() {
                    continue;
                }
                let pair = pairs.len();
                pairs.push(PairLink {
                    a,
                    b,
                    constraints: applicable,
                });
                partners[a].push(PartnerLink { node: b, pair });
                partners[b].push(PartnerLink { node: a, pair });
            }
        }

        Self {
            items,
            lookup,
            partners,
            pairs,
        }
    }

    #[inline]
    pub(crate) fn node(&self, id: ItemId) -> Option<usize> {
        self.lookup.get(&id).copied()
    }

    #[inline]
    pub(crate) fn item(&self, node: usize) -> &Arc<Item> {
        &self.items[node]
    }

    #[inline]
    pub(crate) fn id(&self, node: usize) -> ItemId {
        self.items[node].id()
    }

    #[inline]
    pub(crate) fn partners(&self, node: usize) -> &[PartnerLink] {
        &self.partners[node]
    }

    #[inline]
    pub(crate) fn pair(&self, pair: usize) -> &PairLink {
        &self.pairs[pair]
    }

    pub(crate) fn pairs(&self) -> &[PairLink] {
        &self.pairs
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}
