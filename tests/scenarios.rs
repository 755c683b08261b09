//! End-to-end repair scenarios on small, hand-checked instances.

use std::collections::BTreeMap;

use u_repair::constraint::{ConstraintSet, Dependency, NoOverlap, StartAsap};
use u_repair::error::FailureReason;
use u_repair::models::{Item, ItemId, Lane, ScheduledItem};
use u_repair::scheduler::{RepairScheduler, SchedulerConfig, SeedOrder};
use u_repair::ScheduleError;

fn constraints() -> ConstraintSet {
    ConstraintSet::new()
        .with_single(StartAsap)
        .with_pair(NoOverlap)
        .with_pair(Dependency)
}

fn item(id: ItemId, lane: u32, duration: i64) -> Item {
    Item::on_lane(id, Lane::new(lane), duration).unwrap()
}

/// Panics when two placements sharing a lane overlap.
fn assert_no_lane_overlap(items: &[Item], fixed: &[ScheduledItem], starts: &BTreeMap<ItemId, i64>) {
    let all: Vec<&Item> = items.iter().chain(fixed.iter().map(|f| f.item())).collect();
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            for (lane, da, db) in a.shared_lanes(b) {
                let (sa, sb) = (starts[&a.id()], starts[&b.id()]);
                assert!(
                    sa + da <= sb || sb + db <= sa,
                    "items {} and {} overlap on {lane}",
                    a.id(),
                    b.id()
                );
            }
        }
    }
}

#[test]
fn test_single_item_starts_at_zero() {
    let items = vec![item(1, 0, 42)];
    let outcome = RepairScheduler::new(constraints())
        .schedule(&items, &[])
        .unwrap();

    assert_eq!(outcome.assignments(), BTreeMap::from([(1, 0)]));
    assert_eq!(outcome.makespan(), 42);
    assert_eq!(outcome.iterations, 0);
}

#[test]
fn test_empty_catalog() {
    let outcome = RepairScheduler::new(constraints())
        .schedule(&[], &[])
        .unwrap();
    assert!(outcome.assignments().is_empty());
    assert_eq!(outcome.makespan(), 0);
}

#[test]
fn test_disjoint_lanes_run_in_parallel() {
    let items = vec![item(1, 0, 100), item(2, 1, 100)];
    let mut scheduler = RepairScheduler::new(constraints());
    let outcome = scheduler.schedule(&items, &[]).unwrap();

    assert_eq!(outcome.assignments(), BTreeMap::from([(1, 0), (2, 0)]));
    assert_eq!(outcome.makespan(), 100);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(scheduler.tracker().pair_count(), 0);
}

#[test]
fn test_shared_lane_is_serialized() {
    let items = vec![item(1, 0, 100), item(2, 0, 100)];
    let constraints = ConstraintSet::new().with_single(StartAsap).with_pair(NoOverlap);
    let outcome = RepairScheduler::new(constraints)
        .schedule(&items, &[])
        .unwrap();

    assert_eq!(outcome.makespan(), 200);
    assert_eq!(outcome.escapes, 0);
    assert_no_lane_overlap(&items, &[], &outcome.assignments());
}

#[test]
fn test_dependency_is_repaired() {
    let items = vec![item(2, 0, 100).with_required(1), item(1, 0, 100)];
    let outcome = RepairScheduler::new(constraints())
        .schedule(&items, &[])
        .unwrap();

    assert_eq!(outcome.assignments(), BTreeMap::from([(1, 0), (2, 100)]));
    assert_eq!(outcome.makespan(), 200);
    assert!(outcome.kpi().meets_thresholds(200, 1.0));
}

#[test]
fn test_fixed_item_keeps_its_start() {
    let items = vec![item(1, 0, 100), item(2, 0, 100)];
    let fixed = vec![ScheduledItem::new(item(10, 0, 100), 100)];
    let outcome = RepairScheduler::new(constraints())
        .schedule(&items, &fixed)
        .unwrap();

    let assignments = outcome.assignments();
    assert_eq!(assignments[&10], 100);
    assert_eq!(outcome.makespan(), 300);
    assert_no_lane_overlap(&items, &fixed, &assignments);
    assert_eq!(outcome.kpi().fixed_count, 1);
}

#[test]
fn test_conflicting_fixed_items_fail_fast() {
    let fixed = vec![
        ScheduledItem::new(item(1, 0, 100), 200),
        ScheduledItem::new(item(2, 1, 100).with_required(1), 0),
    ];
    let result = RepairScheduler::new(constraints()).schedule(&[], &fixed);

    match result {
        Err(ScheduleError::SchedulingFailed {
            reason: FailureReason::FixedItemsConflict { items },
            assignments,
        }) => {
            assert_eq!(items, vec![1, 2]);
            assert_eq!(assignments, BTreeMap::from([(1, 200), (2, 0)]));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_requirement_on_fixed_dependent_is_a_local_optimum() {
    let items = vec![item(1, 0, 100)];
    let fixed = vec![ScheduledItem::new(item(11, 0, 100).with_required(1), 0)];
    let result = RepairScheduler::new(constraints()).schedule(&items, &fixed);

    assert!(matches!(
        result,
        Err(ScheduleError::SchedulingFailed {
            reason: FailureReason::LocalOptimum { worst: 1 },
            ..
        })
    ));
}

#[test]
fn test_invalid_duration_is_rejected() {
    assert!(matches!(
        Item::on_lane(1, Lane::new(0), 0),
        Err(ScheduleError::InvalidItem { id: 1, .. })
    ));
}

#[test]
fn test_runs_are_deterministic() {
    let items = vec![
        item(3, 1, 30).with_required(1),
        item(1, 0, 50),
        item(2, 0, 40).with_required(1),
        item(4, 1, 20),
    ];
    let first = RepairScheduler::new(constraints())
        .schedule(&items, &[])
        .unwrap();
    let second = RepairScheduler::new(constraints())
        .schedule(&items, &[])
        .unwrap();

    assert_eq!(first.assignments(), second.assignments());
    assert_eq!(first.backsteps, second.backsteps);
    assert_eq!(first.snapshots, second.snapshots);
}

#[test]
fn test_reused_result_is_stable() {
    let items = vec![item(2, 0, 100).with_required(1), item(1, 0, 100)];
    let mut scheduler = RepairScheduler::new(constraints())
        .with_config(SchedulerConfig::default().with_result_reuse(true));

    let first = scheduler.schedule(&items, &[]).unwrap();
    let second = scheduler.schedule(&items, &[]).unwrap();

    assert_eq!(first.assignments(), second.assignments());
    // Reseeded from the previous result: nothing left to repair.
    assert_eq!(second.snapshots[0].assignments, first.assignments());
}

#[test]
fn test_every_seed_order_yields_a_valid_plan() {
    let items = vec![
        item(1, 0, 50),
        item(2, 0, 20),
        item(3, 1, 70),
        Item::new(4, [(Lane::new(0), 30), (Lane::new(1), 10)]).unwrap(),
        item(5, 1, 40),
    ];
    let orders = [
        SeedOrder::InputOrder,
        SeedOrder::LongestFirst,
        SeedOrder::ShortestFirst,
        SeedOrder::Shuffled { seed: 7 },
    ];

    for order in orders {
        let config = SchedulerConfig::default().with_seed_order(order);
        let outcome = RepairScheduler::new(constraints())
            .with_config(config)
            .schedule(&items, &[])
            .unwrap();
        assert_eq!(outcome.assignments().len(), 5);
        assert_no_lane_overlap(&items, &[], &outcome.assignments());
    }
}

#[test]
fn test_prediction_does_not_change_the_result() {
    let items = vec![
        item(1, 0, 30),
        item(2, 0, 30).with_required(1),
        item(3, 1, 20).with_required(2),
        item(4, 1, 60),
    ];
    let with = RepairScheduler::new(constraints())
        .schedule(&items, &[])
        .unwrap();
    let without = RepairScheduler::new(constraints())
        .with_config(SchedulerConfig::default().with_prediction(false))
        .schedule(&items, &[])
        .unwrap();

    assert_eq!(with.assignments(), without.assignments());
}
