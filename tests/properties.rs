//! Randomized checks of tracker bookkeeping and scheduler results.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use u_repair::constraint::{ConstraintSet, Dependency, NoOverlap, StartAsap};
use u_repair::models::{Item, ItemId, Lane, Plan, ScheduledItem};
use u_repair::scheduler::{RepairScheduler, SchedulerConfig};
use u_repair::tracker::ViolationTracker;

const FIXED_ID: ItemId = 100;

fn constraints() -> ConstraintSet {
    ConstraintSet::new()
        .with_single(StartAsap)
        .with_pair(NoOverlap)
        .with_pair(Dependency)
}

/// `(lane, duration, requires previous)` per item; ids start at 1 and an
/// item may only require the item right before it.
fn item_specs() -> impl Strategy<Value = Vec<(u32, i64, bool)>> {
    prop::collection::vec((0u32..3, 1i64..60, any::<bool>()), 1..8)
}

fn build_items(specs: &[(u32, i64, bool)]) -> Vec<Item> {
    specs
        .iter()
        .enumerate()
        .map(|(idx, &(lane, duration, requires_previous))| {
            let id = idx as ItemId + 1;
            let item = Item::on_lane(id, Lane::new(lane), duration).unwrap();
            if requires_previous && id > 1 {
                item.with_required(id - 1)
            } else {
                item
            }
        })
        .collect()
}

fn overlaps(a: &ScheduledItem, b: &ScheduledItem) -> bool {
    a.item()
        .shared_lanes(b.item())
        .any(|(_, da, db)| a.start() < b.start() + db && b.start() < a.start() + da)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_committed_scores_match_full_rescoring(
        specs in item_specs(),
        starts in prop::collection::vec(0i64..200, 8),
        moves in prop::collection::vec((0usize..8, 0i64..200), 0..24),
    ) {
        let items = build_items(&specs);
        let mut plan = Plan::new();
        for (item, &start) in items.iter().zip(&starts) {
            plan.add(Arc::new(item.clone()), start).unwrap();
        }
        let mut tracker = ViolationTracker::new(constraints());
        tracker.initialize(&plan);

        for (idx, start) in moves {
            let id = (idx % items.len()) as ItemId + 1;
            let candidate = plan.get(id).unwrap().with_start(start);
            if let Ok(update) = tracker.try_violator_update(&candidate, &plan) {
                plan.move_item(id, start).unwrap();
                tracker.update_violator(update);
            }
        }

        for placed in plan.items() {
            let tracked = tracker.violator(placed.id()).unwrap();
            prop_assert_eq!(tracked.item().start(), placed.start());
            prop_assert_eq!(tracked.score(), tracker.check_violations_for_item(placed, &plan));
        }
        prop_assert_eq!(tracker.total_score(), tracker.check_violations_for_plan(&plan));
    }

    #[test]
    fn test_successful_runs_hold_hard_constraints(
        specs in item_specs(),
        fixed_start in prop::option::of(0i64..150),
    ) {
        let items = build_items(&specs);
        let fixed: Vec<ScheduledItem> = fixed_start
            .map(|start| ScheduledItem::new(Item::on_lane(FIXED_ID, Lane::new(0), 25).unwrap(), start))
            .into_iter()
            .collect();
        let config = SchedulerConfig::default()
            .with_snapshots(false)
            .with_max_iterations(10_000);

        let Ok(outcome) = RepairScheduler::new(constraints())
            .with_config(config)
            .schedule(&items, &fixed)
        else {
            return Ok(());
        };

        let assignments: BTreeMap<ItemId, i64> = outcome.assignments();
        prop_assert_eq!(assignments.len(), items.len() + fixed.len());
        if let Some(start) = fixed_start {
            prop_assert_eq!(assignments[&FIXED_ID], start);
        }

        let placed: Vec<&ScheduledItem> = outcome.plan.items().collect();
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                prop_assert!(!overlaps(a, b), "{:?} overlaps {:?}", a, b);
                for (dependent, required) in [(a, b), (b, a)] {
                    if dependent.item().requires(required.id()) {
                        prop_assert!(dependent.start() >= required.max_end());
                    }
                }
            }
        }
    }
}
