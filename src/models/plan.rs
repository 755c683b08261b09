//! Plan (working solution) model.
//!
//! A plan is the set of currently placed items. It maintains a multiset of
//! boundary times (every start and every lane end) so that the makespan
//! and the candidate start values for the repair loop are available without
//! rescanning items.
//!
//! All tables are shared behind [`Arc`] and copied on first write, so
//! cloning a plan to explore an alternative is O(1) and never affects the
//! original.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{Item, ItemId, Lane, ScheduledItem};
use crate::error::{PlanOperation, PlanViolation, ScheduleError};

/// The mutable aggregate of all committed placements.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    items: Arc<BTreeMap<ItemId, ScheduledItem>>,
    /// Boundary time → multiplicity.
    boundaries: Arc<BTreeMap<i64, usize>>,
    fixed: Arc<BTreeSet<ItemId>>,
    /// Required item → items that require it.
    dependents: Arc<BTreeMap<ItemId, BTreeSet<ItemId>>>,
}

fn illegal(id: ItemId, op: PlanOperation, reason: PlanViolation) -> ScheduleError {
    ScheduleError::IllegalPlanOperation { id, op, reason }
}

impl Plan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `item` at `start`.
    ///
    /// # Errors
    /// [`ScheduleError::IllegalPlanOperation`] if the item is already placed.
    pub fn add(&mut self, item: Arc<Item>, start: i64) -> Result<ScheduledItem, ScheduleError> {
        let scheduled = ScheduledItem::new(item, start);
        self.insert(scheduled.clone())?;
        Ok(scheduled)
    }

    /// Inserts a placement, registering the item's requirements.
    pub fn insert(&mut self, scheduled: ScheduledItem) -> Result<(), ScheduleError> {
        let id = scheduled.id();
        if self.items.contains_key(&id) {
            return Err(illegal(id, PlanOperation::Insert, PlanViolation::AlreadyScheduled));
        }

        if !scheduled.item().required().is_empty() {
            let dependents = Arc::make_mut(&mut self.dependents);
            for &required in scheduled.item().required() {
                dependents.entry(required).or_default().insert(id);
            }
        }
        add_boundaries(Arc::make_mut(&mut self.boundaries), &scheduled);
        Arc::make_mut(&mut self.items).insert(id, scheduled);
        Ok(())
    }

    /// Marks a placed item as fixed. Fixed items can never be moved or
    /// unscheduled afterwards.
    pub fn fixate(&mut self, id: ItemId) -> Result<(), ScheduleError> {
        if !self.items.contains_key(&id) {
            return Err(illegal(id, PlanOperation::Fixate, PlanViolation::NotScheduled));
        }
        if !Arc::make_mut(&mut self.fixed).insert(id) {
            return Err(illegal(id, PlanOperation::Fixate, PlanViolation::Fixed));
        }
        Ok(())
    }

    /// Moves a placed, non-fixed item to `start` and returns the new placement.
    pub fn move_item(&mut self, id: ItemId, start: i64) -> Result<ScheduledItem, ScheduleError> {
        let current = self.mutable_entry(id, PlanOperation::Move)?;
        if current.start() == start {
            return Ok(current);
        }

        let moved = current.with_start(start);
        let boundaries = Arc::make_mut(&mut self.boundaries);
        remove_boundaries(boundaries, &current);
        add_boundaries(boundaries, &moved);
        Arc::make_mut(&mut self.items).insert(id, moved.clone());
        Ok(moved)
    }

    /// Removes a placed, non-fixed item and returns its last placement.
    ///
    /// The dependency adjacency is structural and survives unscheduling.
    pub fn unschedule(&mut self, id: ItemId) -> Result<ScheduledItem, ScheduleError> {
        let current = self.mutable_entry(id, PlanOperation::Unschedule)?;
        remove_boundaries(Arc::make_mut(&mut self.boundaries), &current);
        Arc::make_mut(&mut self.items).remove(&id);
        Ok(current)
    }

    /// Shifts every non-fixed item by `delta`.
    pub fn shift_all(&mut self, delta: i64) {
        if delta == 0 {
            return;
        }
        let fixed = Arc::clone(&self.fixed);
        let items = Arc::make_mut(&mut self.items);
        for (id, scheduled) in items.iter_mut() {
            if !fixed.contains(id) {
                *scheduled = scheduled.shifted(delta);
            }
        }

        let mut boundaries = BTreeMap::new();
        for scheduled in items.values() {
            add_boundaries(&mut boundaries, scheduled);
        }
        self.boundaries = Arc::new(boundaries);
    }

    fn mutable_entry(&self, id: ItemId, op: PlanOperation) -> Result<ScheduledItem, ScheduleError> {
        let current = self
            .items
            .get(&id)
            .ok_or_else(|| illegal(id, op, PlanViolation::NotScheduled))?;
        if self.fixed.contains(&id) {
            return Err(illegal(id, op, PlanViolation::Fixed));
        }
        Ok(current.clone())
    }

    #[inline]
    pub fn get(&self, id: ItemId) -> Option<&ScheduledItem> {
        self.items.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    #[inline]
    pub fn is_fixed(&self, id: ItemId) -> bool {
        self.fixed.contains(&id)
    }

    /// Whether the item is placed and not fixed.
    #[inline]
    pub fn can_be_moved(&self, id: ItemId) -> bool {
        self.contains(id) && !self.is_fixed(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Placements in ascending id order.
    pub fn items(&self) -> impl Iterator<Item = &ScheduledItem> {
        self.items.values()
    }

    /// Fixed item ids in ascending order.
    pub fn fixed_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.fixed.iter().copied()
    }

    /// Latest boundary time, never below zero.
    pub fn makespan(&self) -> i64 {
        self.boundaries
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
            .max(0)
    }

    /// Every distinct boundary time plus 0, ascending.
    pub fn candidate_starts(&self) -> Vec<i64> {
        let mut starts: Vec<i64> = self.boundaries.keys().copied().collect();
        if let Err(pos) = starts.binary_search(&0) {
            starts.insert(pos, 0);
        }
        starts
    }

    /// Placed items that require `id`, ordered by (start, id).
    pub fn dependents_of(&self, id: ItemId) -> Vec<ScheduledItem> {
        let mut dependents: Vec<ScheduledItem> = self
            .dependents
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|dep| self.items.get(dep).cloned())
            .collect();
        dependents.sort_by_key(|s| (s.start(), s.id()));
        dependents
    }

    /// Item → start mapping.
    pub fn assignments(&self) -> BTreeMap<ItemId, i64> {
        self.items.iter().map(|(&id, s)| (id, s.start())).collect()
    }

    /// Every lane occupied by at least one placement.
    pub fn lanes(&self) -> BTreeSet<Lane> {
        self.items.values().flat_map(|s| s.item().lanes()).collect()
    }

    /// Total occupied time on `lane` (overlaps counted twice).
    pub fn lane_busy_time(&self, lane: Lane) -> i64 {
        self.items.values().filter_map(|s| s.item().duration(lane)).sum()
    }

    /// Lane utilization: busy time / horizon.
    ///
    /// Returns `None` if `horizon` is not positive.
    pub fn lane_utilization(&self, lane: Lane, horizon: i64) -> Option<f64> {
        if horizon <= 0 {
            return None;
        }
        Some(self.lane_busy_time(lane) as f64 / horizon as f64)
    }

    /// Utilization of every lane against the makespan.
    pub fn all_utilizations(&self) -> BTreeMap<Lane, f64> {
        let makespan = self.makespan();
        self.lanes()
            .into_iter()
            .filter_map(|lane| self.lane_utilization(lane, makespan).map(|u| (lane, u)))
            .collect()
    }
}

fn add_boundaries(boundaries: &mut BTreeMap<i64, usize>, scheduled: &ScheduledItem) {
    *boundaries.entry(scheduled.start()).or_insert(0) += 1;
    for (_, end) in scheduled.ends() {
        *boundaries.entry(end).or_insert(0) += 1;
    }
}

fn remove_boundaries(boundaries: &mut BTreeMap<i64, usize>, scheduled: &ScheduledItem) {
    let times = std::iter::once(scheduled.start()).chain(scheduled.ends().map(|(_, end)| end));
    for time in times {
        if let Some(count) = boundaries.get_mut(&time) {
            *count -= 1;
            if *count == 0 {
                boundaries.remove(&time);
            }
        }
    }
}
