//! Conflict blocks and the interned block store.

use dashmap::DashMap;
use std::sync::Arc;

/// Predicted conflict magnitude at one relative offset.
///
/// `definite` is certain to be incurred; `possible` may or may not be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConflictEstimate {
    pub definite: i64,
    pub possible: i64,
}

impl ConflictEstimate {
    pub const ZERO: ConflictEstimate = ConflictEstimate {
        definite: 0,
        possible: 0,
    };

    pub const fn new(definite: i64, possible: i64) -> Self {
        Self { definite, possible }
    }

    /// Certain conflict of magnitude `value`.
    pub const fn definite(value: i64) -> Self {
        Self::new(value, 0)
    }

    /// Uncertain conflict of magnitude `value`.
    pub const fn possible(value: i64) -> Self {
        Self::new(0, value)
    }

    /// Applies `merge` channel-wise.
    pub(crate) fn combine(self, other: Self, merge: Merge) -> Self {
        match merge {
            Merge::Add => Self::new(self.definite + other.definite, self.possible + other.possible),
            Merge::Subtract => {
                Self::new(self.definite - other.definite, self.possible - other.possible)
            }
            Merge::Max => Self::new(
                self.definite.max(other.definite),
                self.possible.max(other.possible),
            ),
        }
    }
}

/// Pointwise combination of curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Merge {
    Add,
    Subtract,
    Max,
}

/// Extent of a block in relative time. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Span {
    Before { end: i64 },
    Middle { start: i64, end: i64 },
    After { start: i64 },
}

impl Span {
    #[inline]
    pub(crate) fn start(&self) -> i64 {
        match *self {
            Span::Before { .. } => i64::MIN,
            Span::Middle { start, .. } | Span::After { start } => start,
        }
    }

    #[inline]
    pub(crate) fn end(&self) -> i64 {
        match *self {
            Span::Before { end } | Span::Middle { end, .. } => end,
            Span::After { .. } => i64::MAX,
        }
    }
}

/// One segment of a conflict curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Block {
    pub(crate) span: Span,
    pub(crate) values: ConflictEstimate,
}

/// Append-only store sharing structurally identical blocks.
///
/// Lookups and inserts are safe from concurrent merge workers; entries are
/// keyed by value and never mutated after insertion.
#[derive(Debug, Default)]
pub(crate) struct BlockStore {
    blocks: DashMap<Block, Arc<Block>>,
}

impl BlockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn intern(&self, block: Block) -> Arc<Block> {
        debug_assert!(
            block.values.definite >= 0 && block.values.possible >= 0,
            "negative conflict block {block:?}"
        );
        if let Some(shared) = self.blocks.get(&block) {
            return Arc::clone(shared.value());
        }
        Arc::clone(self.blocks.entry(block).or_insert_with(|| Arc::new(block)).value())
    }

    pub(crate) fn before(&self, values: ConflictEstimate, end: i64) -> Arc<Block> {
        self.intern(Block {
            span: Span::Before { end },
            values,
        })
    }

    pub(crate) fn middle(&self, values: ConflictEstimate, start: i64, end: i64) -> Arc<Block> {
        self.intern(Block {
            span: Span::Middle { start, end },
            values,
        })
    }

    pub(crate) fn after(&self, values: ConflictEstimate, start: i64) -> Arc<Block> {
        self.intern(Block {
            span: Span::After { start },
            values,
        })
    }

    /// Number of distinct blocks.
    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine() {
        let a = ConflictEstimate::new(3, 5);
        let b = ConflictEstimate::new(4, 1);
        assert_eq!(a.combine(b, Merge::Add), ConflictEstimate::new(7, 6));
        assert_eq!(a.combine(b, Merge::Max), ConflictEstimate::new(4, 5));
        assert_eq!(
            a.combine(b, Merge::Add).combine(b, Merge::Subtract),
            a
        );
    }

    #[test]
    fn test_span_bounds() {
        assert_eq!(Span::Before { end: 4 }.start(), i64::MIN);
        assert_eq!(Span::Before { end: 4 }.end(), 4);
        assert_eq!(Span::Middle { start: -2, end: 4 }.start(), -2);
        assert_eq!(Span::After { start: 9 }.end(), i64::MAX);
    }

    #[test]
    fn test_store_interns_by_value() {
        let store = BlockStore::new();
        let a = store.middle(ConflictEstimate::definite(10), 0, 0);
        let b = store.middle(ConflictEstimate::definite(10), 0, 0);
        let c = store.middle(ConflictEstimate::possible(10), 0, 0);
        let d = store.after(ConflictEstimate::definite(10), 0);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_ne!(*a, *d);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_store_is_shared_across_threads() {
        let store = BlockStore::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for end in 0..50 {
                        store.before(ConflictEstimate::ZERO, end);
                    }
                });
            }
        });
        assert_eq!(store.len(), 50);
    }
}
