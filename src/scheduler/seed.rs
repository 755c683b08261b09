//! Greedy seed plan.
//!
//! # Algorithm
//!
//! 1. Insert the fixed placements and mark them fixed.
//! 2. With a previous result, put every unchanged item back at its previous
//!    start.
//! 3. Append each remaining item at the latest end seen so far on any lane it
//!    occupies (list scheduling), in the configured [`SeedOrder`].
//!
//! Fixed placements do not raise the running lane ends; conflicts with them
//! are left for the repair loop.
//!
//! # Complexity
//! O(n · l · log n) for n items on l lanes each.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::SeedOrder;
use crate::error::ScheduleError;
use crate::models::{Item, Lane, Plan, ScheduledItem};

/// Items in seeding order.
pub(crate) fn order_items(items: &[Item], order: SeedOrder) -> Vec<Arc<Item>> {
    let mut ordered: Vec<Arc<Item>> = items.iter().cloned().map(Arc::new).collect();
    match order {
        SeedOrder::InputOrder => {}
        SeedOrder::LongestFirst => {
            ordered.sort_by_key(|item| (std::cmp::Reverse(item.duration_summary()), item.id()));
        }
        SeedOrder::ShortestFirst => {
            ordered.sort_by_key(|item| (item.duration_summary(), item.id()));
        }
        SeedOrder::Shuffled { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            ordered.shuffle(&mut rng);
        }
    }
    ordered
}

/// Seed plan and the number of items placed from the previous result.
pub(crate) fn seed_plan(
    items: &[Arc<Item>],
    fixed: &[ScheduledItem],
    previous: Option<&Plan>,
) -> Result<(Plan, usize), ScheduleError> {
    let mut plan = Plan::new();
    for placement in fixed {
        plan.insert(placement.clone())?;
        plan.fixate(placement.id())?;
    }

    let mut lane_ends: BTreeMap<Lane, i64> = BTreeMap::new();
    let mut pending = Vec::with_capacity(items.len());
    let mut reused = 0;
    for item in items {
        match previous.and_then(|prev| prev.get(item.id())) {
            Some(prior) if prior.item() == item.as_ref() => {
                let placed = plan.add(Arc::clone(item), prior.start())?;
                raise_lane_ends(&mut lane_ends, &placed);
                reused += 1;
            }
            _ => pending.push(item),
        }
    }

    for item in pending {
        let start = item
            .lanes()
            .filter_map(|lane| lane_ends.get(&lane).copied())
            .fold(0, i64::max);
        let placed = plan.add(Arc::clone(item), start)?;
        raise_lane_ends(&mut lane_ends, &placed);
    }

    Ok((plan, reused))
}

fn raise_lane_ends(lane_ends: &mut BTreeMap<Lane, i64>, placed: &ScheduledItem) {
    for (lane, end) in placed.ends() {
        let current = lane_ends.entry(lane).or_insert(end);
        *current = (*current).max(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;

    fn item(id: ItemId, lanes: &[(u32, i64)]) -> Item {
        Item::new(id, lanes.iter().map(|&(l, d)| (Lane::new(l), d))).unwrap()
    }

    fn ids(items: &[Arc<Item>]) -> Vec<ItemId> {
        items.iter().map(|i| i.id()).collect()
    }

    #[test]
    fn test_appends_per_lane() {
        let items = order_items(
            &[
                item(1, &[(0, 10)]),
                item(2, &[(1, 20)]),
                item(3, &[(0, 5), (1, 5)]),
                item(4, &[(0, 7)]),
            ],
            SeedOrder::InputOrder,
        );
        let (plan, reused) = seed_plan(&items, &[], None).unwrap();
        assert_eq!(reused, 0);
        let starts: Vec<i64> = plan.items().map(ScheduledItem::start).collect();
        assert_eq!(starts, vec![0, 0, 20, 25]);
        assert_eq!(plan.makespan(), 32);
    }

    #[test]
    fn test_fixed_items_are_placed_and_fixed() {
        let items = order_items(&[item(1, &[(0, 10)])], SeedOrder::InputOrder);
        let fixed = vec![ScheduledItem::new(item(9, &[(0, 10)]), 50)];
        let (plan, _) = seed_plan(&items, &fixed, None).unwrap();

        assert!(plan.is_fixed(9));
        assert_eq!(plan.get(9).unwrap().start(), 50);
        assert_eq!(plan.get(1).unwrap().start(), 0);
    }

    #[test]
    fn test_duplicate_fixed_is_rejected() {
        let fixed = vec![
            ScheduledItem::new(item(9, &[(0, 10)]), 0),
            ScheduledItem::new(item(9, &[(0, 10)]), 20),
        ];
        assert!(seed_plan(&[], &fixed, None).is_err());
    }

    #[test]
    fn test_orders() {
        let items = [
            item(1, &[(0, 10)]),
            item(2, &[(0, 30)]),
            item(3, &[(0, 20)]),
            item(4, &[(1, 30)]),
        ];
        assert_eq!(ids(&order_items(&items, SeedOrder::LongestFirst)), vec![2, 4, 3, 1]);
        assert_eq!(ids(&order_items(&items, SeedOrder::ShortestFirst)), vec![1, 3, 2, 4]);

        let a = order_items(&items, SeedOrder::Shuffled { seed: 42 });
        let b = order_items(&items, SeedOrder::Shuffled { seed: 42 });
        assert_eq!(ids(&a), ids(&b));
        let mut sorted = ids(&a);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_previous_result_is_reused_for_unchanged_items() {
        let mut previous = Plan::new();
        previous.add(Arc::new(item(1, &[(0, 10)])), 40).unwrap();
        previous.add(Arc::new(item(2, &[(0, 10)])), 0).unwrap();

        // Item 2 changed its duration and is treated as new.
        let items = order_items(
            &[item(1, &[(0, 10)]), item(2, &[(0, 15)]), item(3, &[(1, 5)])],
            SeedOrder::InputOrder,
        );
        let (plan, reused) = seed_plan(&items, &[], Some(&previous)).unwrap();
        assert_eq!(reused, 1);
        assert_eq!(plan.get(1).unwrap().start(), 40);
        assert_eq!(plan.get(2).unwrap().start(), 50);
        assert_eq!(plan.get(3).unwrap().start(), 0);
    }
}
