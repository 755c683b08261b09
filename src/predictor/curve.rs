//! Piecewise conflict curves.
//!
//! A curve partitions the time axis into an unbounded "before" block, zero
//! or more finite "middle" blocks and an unbounded "after" block. Blocks are
//! contiguous: each block starts one unit after the previous one ends.
//! Block bounds are relative to the curve's anchor, so a curve can be
//! repositioned without touching its blocks.
//!
//! Merging collects every boundary of the operands, then evaluates each
//! operand once per resulting segment. Because all operands are contiguous
//! partitions, boundary starts and ends pair up one-to-one.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::block::{Block, BlockStore, ConflictEstimate, Merge};
use super::pool::MergePool;
use crate::constraint::{Outcome, Prediction};

#[derive(Debug, Clone)]
pub(crate) struct Curve {
    anchor: i64,
    before: Arc<Block>,
    middles: Vec<Arc<Block>>,
    after: Arc<Block>,
}

impl Curve {
    /// Zero everywhere.
    pub(crate) fn empty(store: &BlockStore) -> Self {
        Self {
            anchor: 0,
            before: store.before(ConflictEstimate::ZERO, -1),
            middles: Vec::new(),
            after: store.after(ConflictEstimate::ZERO, 0),
        }
    }

    /// Builds a curve from contiguous parts, dropping empty middles.
    fn from_parts(
        store: &BlockStore,
        before: (ConflictEstimate, i64),
        middles: &[(ConflictEstimate, i64, i64)],
        after: (ConflictEstimate, i64),
    ) -> Self {
        let middles: Vec<Arc<Block>> = middles
            .iter()
            .filter(|&&(_, start, end)| start <= end)
            .map(|&(values, start, end)| store.middle(values, start, end))
            .collect();
        let curve = Self {
            anchor: 0,
            before: store.before(before.0, before.1),
            middles,
            after: store.after(after.0, after.1),
        };
        debug_assert!(curve.is_contiguous(), "non-contiguous curve {curve:?}");
        curve
    }

    /// Conflict shape of one pair, combining every constraint's prediction
    /// for that pair by pointwise maximum.
    ///
    /// Offsets are `moved.start - fixed.start`; `moved_len` and `fixed_len`
    /// are the two items' maximum durations.
    pub(crate) fn for_predictions(
        predictions: &[Prediction],
        moved_len: i64,
        fixed_len: i64,
        store: &BlockStore,
        pool: &MergePool,
    ) -> Self {
        let shapes: Vec<Curve> = predictions
            .iter()
            .filter(|p| p.value() > 0)
            .flat_map(|p| {
                [
                    Self::before_shape(p.before, p.value(), moved_len, store),
                    Self::together_shape(p.together, p.value(), moved_len, fixed_len, store),
                    Self::after_shape(p.after, p.value(), moved_len, fixed_len, store),
                ]
            })
            .collect();

        match shapes.split_first() {
            None => Self::empty(store),
            Some((first, rest)) => {
                let rest: Vec<&Curve> = rest.iter().collect();
                first.merge(&rest, Merge::Max, store, pool)
            }
        }
    }

    fn before_shape(outcome: Outcome, value: i64, dm: i64, store: &BlockStore) -> Self {
        let zero = ConflictEstimate::ZERO;
        match outcome {
            Outcome::Conflict => Self::from_parts(
                store,
                (ConflictEstimate::definite(value), -dm),
                &[(ConflictEstimate::possible(value), -(dm - 1), -1)],
                (zero, 0),
            ),
            Outcome::Unknown => {
                Self::from_parts(store, (ConflictEstimate::possible(value), -1), &[], (zero, 0))
            }
            Outcome::NoConflict => Self::empty(store),
        }
    }

    fn together_shape(outcome: Outcome, value: i64, dm: i64, df: i64, store: &BlockStore) -> Self {
        let zero = ConflictEstimate::ZERO;
        match outcome {
            Outcome::Conflict => Self::from_parts(
                store,
                (zero, -dm),
                &[
                    (ConflictEstimate::possible(value), -(dm - 1), -1),
                    (ConflictEstimate::definite(value), 0, 0),
                    (ConflictEstimate::possible(value), 1, df - 1),
                ],
                (zero, df),
            ),
            Outcome::Unknown => Self::from_parts(
                store,
                (zero, -dm),
                &[(ConflictEstimate::possible(value), -(dm - 1), df - 1)],
                (zero, df),
            ),
            Outcome::NoConflict => Self::empty(store),
        }
    }

    fn after_shape(outcome: Outcome, value: i64, dm: i64, df: i64, store: &BlockStore) -> Self {
        let zero = ConflictEstimate::ZERO;
        match outcome {
            Outcome::Conflict => Self::from_parts(
                store,
                (zero, df - dm),
                &[(ConflictEstimate::possible(value), df - (dm - 1), df - 1)],
                (ConflictEstimate::definite(value), df),
            ),
            Outcome::Unknown => Self::from_parts(
                store,
                (zero, df - dm),
                &[],
                (ConflictEstimate::possible(value), df - (dm - 1)),
            ),
            Outcome::NoConflict => Self::empty(store),
        }
    }

    #[inline]
    pub(crate) fn anchor(&self) -> i64 {
        self.anchor
    }

    #[inline]
    pub(crate) fn set_anchor(&mut self, anchor: i64) {
        self.anchor = anchor;
    }

    /// Number of blocks, including the unbounded ones.
    pub(crate) fn segment_count(&self) -> usize {
        self.middles.len() + 2
    }

    /// Value at absolute time `time`. O(log k) in the number of middles.
    pub(crate) fn value_at(&self, time: i64) -> ConflictEstimate {
        self.block_at(time).values
    }

    fn block_at(&self, time: i64) -> &Block {
        let relative = time - self.anchor;
        if relative <= self.before.span.end() {
            return &self.before;
        }
        if relative >= self.after.span.start() {
            return &self.after;
        }
        let idx = self.middles.partition_point(|b| b.span.end() < relative);
        debug_assert!(idx < self.middles.len(), "gap in curve at {relative}");
        self.middles.get(idx).map_or(&self.after, |b| b)
    }

    fn collect_bounds(&self, starts: &mut BTreeSet<i64>, ends: &mut BTreeSet<i64>) {
        ends.insert(self.before.span.end() + self.anchor);
        for block in &self.middles {
            starts.insert(block.span.start() + self.anchor);
            ends.insert(block.span.end() + self.anchor);
        }
        starts.insert(self.after.span.start() + self.anchor);
    }

    /// Pointwise merge of `self` with `others`. The result is anchored at 0.
    ///
    /// Middle segments are computed through `pool`; the unbounded blocks
    /// are computed inline.
    pub(crate) fn merge(
        &self,
        others: &[&Curve],
        merge: Merge,
        store: &BlockStore,
        pool: &MergePool,
    ) -> Curve {
        let mut starts = BTreeSet::new();
        let mut ends = BTreeSet::new();
        self.collect_bounds(&mut starts, &mut ends);
        for other in others {
            other.collect_bounds(&mut starts, &mut ends);
        }
        let starts: Vec<i64> = starts.into_iter().collect();
        let ends: Vec<i64> = ends.into_iter().collect();
        debug_assert_eq!(starts.len(), ends.len());

        let combine_at = |time: i64| {
            others
                .iter()
                .fold(self.value_at(time), |acc, c| acc.combine(c.value_at(time), merge))
        };

        let before = others.iter().fold(self.before.values, |acc, c| {
            acc.combine(c.before.values, merge)
        });
        let after = others
            .iter()
            .fold(self.after.values, |acc, c| acc.combine(c.after.values, merge));

        let last = starts.len() - 1;
        let middles = pool.gather(last, |k| {
            let start = starts[k];
            store.middle(combine_at(start), start, ends[k + 1])
        });

        Curve {
            anchor: 0,
            before: store.before(before, ends[0]),
            middles,
            after: store.after(after, starts[last]),
        }
        .coalesced(store)
    }

    /// Joins neighbouring blocks carrying equal values.
    fn coalesced(self, store: &BlockStore) -> Curve {
        if self.middles.is_empty() {
            return self;
        }

        let before_values = self.before.values;
        let mut before_end = self.before.span.end();
        let mut runs: Vec<(ConflictEstimate, i64, i64)> = Vec::with_capacity(self.middles.len());
        for block in &self.middles {
            let (start, end) = (block.span.start(), block.span.end());
            let joined = match runs.last_mut() {
                Some(last) if last.0 == block.values => {
                    last.2 = end;
                    true
                }
                Some(_) => false,
                None if block.values == before_values => {
                    before_end = end;
                    true
                }
                None => false,
            };
            if !joined {
                runs.push((block.values, start, end));
            }
        }

        let after_values = self.after.values;
        let mut after_start = self.after.span.start();
        while let Some(&(values, start, _)) = runs.last() {
            if values != after_values {
                break;
            }
            after_start = start;
            runs.pop();
        }

        if runs.len() == self.middles.len() {
            return self;
        }
        Curve::from_parts(store, (before_values, before_end), &runs, (after_values, after_start))
            .with_anchor(self.anchor)
    }

    fn with_anchor(mut self, anchor: i64) -> Self {
        self.anchor = anchor;
        self
    }

    fn is_contiguous(&self) -> bool {
        let mut expected = self.before.span.end() + 1;
        for block in &self.middles {
            if block.span.start() != expected || block.span.end() < block.span.start() {
                return false;
            }
            expected = block.span.end() + 1;
        }
        self.after.span.start() == expected
    }
}
