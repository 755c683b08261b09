//! Local-optimum escape strategies.
//!
//! Each strategy builds an alternative plan from a clone of the working plan;
//! the working plan itself is never touched. The repair loop ranks the
//! variants and keeps a strictly better one.
//!
//! | Strategy | Effect |
//! |----------|--------|
//! | [`dependency_replan`] | unschedule the requirement closure of the worst item, re-place it greedily |
//! | [`shift_right`] | push the worst item past the makespan, then push and lock whatever it newly hits |
//! | [`shift_left`] | translate the plan right by the makespan, then pull the worst item back the same way |

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::constraint::Score;
use crate::error::{FailureReason, ScheduleError};
use crate::models::{ItemId, Plan, ScheduledItem};
use crate::tracker::ViolationTracker;

/// Movable items reachable from `worst` over requirement edges in either
/// direction, ordered by requirement depth within the closure, then start,
/// then id.
pub(crate) fn requirement_closure(plan: &Plan, worst: ItemId) -> Vec<ScheduledItem> {
    let mut members: BTreeMap<ItemId, ScheduledItem> = BTreeMap::new();
    let mut queue = VecDeque::from([worst]);
    while let Some(id) = queue.pop_front() {
        if members.contains_key(&id) || !plan.can_be_moved(id) {
            continue;
        }
        let Some(placed) = plan.get(id) else {
            continue;
        };
        queue.extend(placed.item().required().iter().copied());
        queue.extend(plan.dependents_of(id).iter().map(ScheduledItem::id));
        members.insert(id, placed.clone());
    }

    // Longest requirement chain inside the closure; bounded passes so a
    // cyclic catalog still terminates.
    let mut depth: BTreeMap<ItemId, usize> = members.keys().map(|&id| (id, 0)).collect();
    for _ in 0..members.len() {
        let mut changed = false;
        for (id, placed) in &members {
            let deepest = placed
                .item()
                .required()
                .iter()
                .filter_map(|req| depth.get(req).map(|d| d + 1))
                .max()
                .unwrap_or(0);
            if deepest > depth[id] {
                depth.insert(*id, deepest);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut ordered: Vec<ScheduledItem> = members.into_values().collect();
    ordered.sort_by_key(|s| (depth[&s.id()], s.start(), s.id()));
    ordered
}

/// Unschedules the requirement closure of `worst` and re-places each member,
/// in closure order, at the existing boundary that scores best for it.
pub(crate) fn dependency_replan(
    plan: &Plan,
    tracker: &ViolationTracker,
    worst: ItemId,
) -> Result<Plan, ScheduleError> {
    let closure = requirement_closure(plan, worst);
    let mut variant = plan.clone();
    for member in &closure {
        variant.unschedule(member.id())?;
    }

    for member in &closure {
        let mut best: Option<(Score, ScheduledItem)> = None;
        for start in variant.candidate_starts() {
            let candidate = member.with_start(start);
            let score = tracker.check_violations_for_item(&candidate, &variant);
            if best.as_ref().map_or(true, |(b, _)| score < *b) {
                best = Some((score, candidate));
            }
        }
        let placed = best.map_or_else(|| member.clone(), |(_, candidate)| candidate);
        variant.insert(placed)?;
    }

    debug!(
        worst,
        closure = closure.len(),
        makespan = variant.makespan(),
        "dependency replan built"
    );
    Ok(variant)
}

/// Moves `worst` right by the makespan, pushing and locking every item it
/// newly conflicts with.
pub(crate) fn shift_right(
    plan: &Plan,
    tracker: &ViolationTracker,
    worst: ItemId,
) -> Result<Plan, ScheduleError> {
    let mut variant = plan.clone();
    shift_and_lock(&mut variant, tracker, worst, plan.makespan())?;
    debug!(worst, makespan = variant.makespan(), "shift right built");
    Ok(variant)
}

/// Translates every movable item right by the makespan, then moves `worst`
/// back left by the same amount with push-and-lock.
pub(crate) fn shift_left(
    plan: &Plan,
    tracker: &ViolationTracker,
    worst: ItemId,
) -> Result<Plan, ScheduleError> {
    let makespan = plan.makespan();
    let mut variant = plan.clone();
    variant.shift_all(makespan);
    shift_and_lock(&mut variant, tracker, worst, -makespan)?;
    debug!(worst, makespan = variant.makespan(), "shift left built");
    Ok(variant)
}

/// Shifts `origin` by `shift` and locks it. Every movable item placed into a
/// new hard conflict by a shift is shifted and locked in turn, until no new
/// conflict appears.
///
/// # Errors
/// [`FailureReason::CircularConstraint`] when a shift newly conflicts with
/// an item that is already locked.
fn shift_and_lock(
    variant: &mut Plan,
    tracker: &ViolationTracker,
    origin: ItemId,
    shift: i64,
) -> Result<(), ScheduleError> {
    let mut locked: BTreeSet<ItemId> = BTreeSet::new();
    let mut batch: BTreeSet<ItemId> = BTreeSet::from([origin]);

    while !batch.is_empty() {
        let violated_before = hard_conflicts(variant, tracker, batch.iter().copied());

        let mut shifted = Vec::with_capacity(batch.len());
        for &id in &batch {
            let Some(start) = variant.get(id).map(ScheduledItem::start) else {
                continue;
            };
            variant.move_item(id, start + shift)?;
            shifted.push(id);
        }
        locked.extend(shifted.iter().copied());

        let mut newly_violated = hard_conflicts(variant, tracker, shifted.into_iter());
        newly_violated.retain(|id| !violated_before.contains(id));

        let conflicting: Vec<ItemId> = newly_violated.intersection(&locked).copied().collect();
        if !conflicting.is_empty() {
            return Err(ScheduleError::SchedulingFailed {
                reason: FailureReason::CircularConstraint {
                    locked: locked.into_iter().collect(),
                    conflicting,
                },
                assignments: variant.assignments(),
            });
        }

        newly_violated.retain(|&id| {
            let movable = variant.can_be_moved(id);
            if !movable {
                debug!(item = id, "shift reached a fixed item");
            }
            movable
        });
        batch = newly_violated;
    }
    Ok(())
}

fn hard_conflicts(
    plan: &Plan,
    tracker: &ViolationTracker,
    ids: impl Iterator<Item = ItemId>,
) -> BTreeSet<ItemId> {
    ids.filter_map(|id| plan.get(id))
        .flat_map(|placed| tracker.hard_violated_items(placed, plan))
        .map(|partner| partner.id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ConstraintSet, Dependency, NoOverlap, StartAsap};
    use crate::models::{Item, Lane};
    use std::sync::Arc;

    fn constraints() -> ConstraintSet {
        ConstraintSet::new()
            .with_single(StartAsap)
            .with_pair(NoOverlap)
            .with_pair(Dependency)
    }

    fn place(plan: &mut Plan, item: Item, start: i64) {
        plan.add(Arc::new(item), start).unwrap();
    }

    fn tracker(plan: &Plan) -> ViolationTracker {
        let mut tracker = ViolationTracker::new(constraints());
        tracker.initialize(plan);
        tracker
    }

    #[test]
    fn test_closure_follows_both_directions() {
        let mut plan = Plan::new();
        place(&mut plan, Item::on_lane(1, Lane::new(0), 10).unwrap(), 30);
        place(&mut plan, Item::on_lane(2, Lane::new(1), 10).unwrap().with_required(1), 0);
        place(&mut plan, Item::on_lane(3, Lane::new(2), 10).unwrap().with_required(2), 0);
        place(&mut plan, Item::on_lane(4, Lane::new(3), 10).unwrap(), 0);
        place(&mut plan, Item::on_lane(5, Lane::new(4), 10).unwrap().with_required(1), 5);

        let ids: Vec<ItemId> = requirement_closure(&plan, 2)
            .iter()
            .map(ScheduledItem::id)
            .collect();
        assert_eq!(ids, vec![1, 2, 5, 3]);
    }

    #[test]
    fn test_closure_stops_at_fixed_items() {
        let mut plan = Plan::new();
        place(&mut plan, Item::on_lane(1, Lane::new(0), 10).unwrap(), 0);
        place(&mut plan, Item::on_lane(2, Lane::new(0), 10).unwrap().with_required(1), 0);
        place(&mut plan, Item::on_lane(3, Lane::new(0), 10).unwrap().with_required(2), 0);
        plan.fixate(2).unwrap();

        let ids: Vec<ItemId> = requirement_closure(&plan, 1)
            .iter()
            .map(ScheduledItem::id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_dependency_replan_orders_chain() {
        let mut plan = Plan::new();
        place(&mut plan, Item::on_lane(1, Lane::new(0), 100).unwrap(), 100);
        place(&mut plan, Item::on_lane(2, Lane::new(0), 100).unwrap().with_required(1), 0);
        let tracker = tracker(&plan);

        let variant = dependency_replan(&plan, &tracker, 2).unwrap();
        assert_eq!(variant.get(1).unwrap().start(), 0);
        assert_eq!(variant.get(2).unwrap().start(), 100);
        assert_eq!(plan.get(1).unwrap().start(), 100);
    }

    #[test]
    fn test_shift_right_pushes_new_conflicts() {
        let mut plan = Plan::new();
        place(&mut plan, Item::on_lane(1, Lane::new(0), 100).unwrap(), 0);
        place(&mut plan, Item::on_lane(2, Lane::new(0), 100).unwrap(), 200);
        place(&mut plan, Item::on_lane(3, Lane::new(1), 100).unwrap().with_required(1), 100);
        let tracker = tracker(&plan);

        let variant = shift_right(&plan, &tracker, 1).unwrap();
        // 3 requires 1 and is pushed by the same amount; 2 is untouched.
        assert_eq!(variant.get(1).unwrap().start(), 300);
        assert_eq!(variant.get(3).unwrap().start(), 400);
        assert_eq!(variant.get(2).unwrap().start(), 200);
        assert_eq!(plan.get(1).unwrap().start(), 0);
    }

    #[test]
    fn test_shift_left_moves_worst_before_the_rest() {
        let mut plan = Plan::new();
        place(&mut plan, Item::on_lane(1, Lane::new(0), 100).unwrap(), 0);
        place(&mut plan, Item::on_lane(2, Lane::new(0), 100).unwrap(), 50);
        let tracker = tracker(&plan);

        let variant = shift_left(&plan, &tracker, 2).unwrap();
        assert_eq!(variant.get(1).unwrap().start(), 150);
        assert_eq!(variant.get(2).unwrap().start(), 50);
    }

    #[test]
    fn test_circular_push_fails() {
        // 1 requires 3, 2 requires 1, 3 requires 2.
        let mut plan = Plan::new();
        place(&mut plan, Item::on_lane(1, Lane::new(0), 100).unwrap().with_required(3), 0);
        place(&mut plan, Item::on_lane(2, Lane::new(1), 100).unwrap().with_required(1), 100);
        place(&mut plan, Item::on_lane(3, Lane::new(2), 100).unwrap().with_required(2), 200);
        let tracker = tracker(&plan);

        match shift_right(&plan, &tracker, 1) {
            Err(ScheduleError::SchedulingFailed {
                reason: FailureReason::CircularConstraint { locked, conflicting },
                ..
            }) => {
                assert_eq!(locked, vec![1, 2, 3]);
                assert_eq!(conflicting, vec![1]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
