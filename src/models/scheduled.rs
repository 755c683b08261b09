//! Placed item model.

use std::fmt;
use std::sync::Arc;

use super::{Item, ItemId, Lane};

/// An [`Item`] bound to a start offset.
///
/// Immutable: a move produces a new value via [`ScheduledItem::with_start`].
/// The item itself is shared, so cloning is cheap.
#[derive(Clone)]
pub struct ScheduledItem {
    item: Arc<Item>,
    start: i64,
}

impl ScheduledItem {
    /// Places `item` at `start`.
    pub fn new(item: impl Into<Arc<Item>>, start: i64) -> Self {
        Self {
            item: item.into(),
            start,
        }
    }

    /// The same item at another start.
    pub fn with_start(&self, start: i64) -> Self {
        Self {
            item: Arc::clone(&self.item),
            start,
        }
    }

    /// The same item shifted by `delta`.
    pub fn shifted(&self, delta: i64) -> Self {
        self.with_start(self.start + delta)
    }

    #[inline]
    pub fn id(&self) -> ItemId {
        self.item.id()
    }

    #[inline]
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Shared handle to the underlying item.
    pub fn item_arc(&self) -> &Arc<Item> {
        &self.item
    }

    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// End time on `lane`, if the item occupies it.
    pub fn end(&self, lane: Lane) -> Option<i64> {
        self.item.duration(lane).map(|d| self.start + d)
    }

    /// Latest end across all lanes.
    #[inline]
    pub fn max_end(&self) -> i64 {
        self.start + self.item.max_duration()
    }

    /// `(lane, end)` for every occupied lane.
    pub fn ends(&self) -> impl Iterator<Item = (Lane, i64)> + '_ {
        self.item
            .durations()
            .iter()
            .map(move |(&lane, &d)| (lane, self.start + d))
    }
}

impl PartialEq for ScheduledItem {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.start == other.start
    }
}

impl Eq for ScheduledItem {}

impl fmt::Debug for ScheduledItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledItem")
            .field("id", &self.id())
            .field("start", &self.start)
            .field("durations", self.item.durations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_ends() {
        let item = Item::new(1, [(Lane::new(0), 10), (Lane::new(1), 25)]).unwrap();
        let placed = ScheduledItem::new(item, 100);

        assert_eq!(placed.end(Lane::new(0)), Some(110));
        assert_eq!(placed.end(Lane::new(1)), Some(125));
        assert_eq!(placed.end(Lane::new(2)), None);
        assert_eq!(placed.max_end(), 125);
        assert_eq!(placed.ends().count(), 2);
    }

    #[test]
    fn test_move_produces_new_value() {
        let placed = ScheduledItem::new(Item::on_lane(1, Lane::new(0), 10).unwrap(), 5);
        let moved = placed.with_start(50);

        assert_eq!(placed.start(), 5);
        assert_eq!(moved.start(), 50);
        assert!(Arc::ptr_eq(placed.item_arc(), moved.item_arc()));
        assert_eq!(moved.shifted(-20).start(), 30);
        assert_ne!(placed, moved);
        assert_eq!(moved, placed.with_start(50));
    }
}
