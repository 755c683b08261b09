//! Criterion benchmarks for the repair loop.
//!
//! Run with: `cargo bench`
//!
//! Benchmark groups:
//! 1. Full schedule runs (various catalog sizes, prediction on/off)
//! 2. Tracker initialization (graph build, scoring, predictor build)

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use u_repair::constraint::{ConstraintSet, Dependency, NoOverlap, StartAsap};
use u_repair::models::{Item, Lane, Plan};
use u_repair::scheduler::{RepairScheduler, SchedulerConfig};
use u_repair::tracker::ViolationTracker;

const LANES: u32 = 4;

fn constraints() -> ConstraintSet {
    ConstraintSet::new()
        .with_single(StartAsap)
        .with_pair(NoOverlap)
        .with_pair(Dependency)
}

/// Catalog of `n` items over [`LANES`] lanes. Every fifth item also occupies
/// the next lane and every third item requires its predecessor.
fn catalog(n: u32) -> Vec<Item> {
    (1..=n)
        .filter_map(|id| {
            let lane = Lane::new(id % LANES);
            let duration = 10 + i64::from((id * 37) % 50);
            let mut durations = vec![(lane, duration)];
            if id % 5 == 0 {
                durations.push((Lane::new((id + 1) % LANES), duration / 2));
            }
            let item = Item::new(id, durations).ok()?;
            Some(if id % 3 == 0 {
                item.with_required(id - 1)
            } else {
                item
            })
        })
        .collect()
}

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");
    group.sample_size(10);

    for &n in &[20u32, 60, 120] {
        let items = catalog(n);
        for prediction in [true, false] {
            let config = SchedulerConfig::default()
                .with_snapshots(false)
                .with_prediction(prediction);
            let label = if prediction { "predicted" } else { "plain" };
            group.bench_with_input(BenchmarkId::new(label, n), &items, |b, items| {
                b.iter(|| {
                    let mut scheduler =
                        RepairScheduler::new(constraints()).with_config(config.clone());
                    black_box(scheduler.schedule(black_box(items), &[]).ok())
                });
            });
        }
    }
    group.finish();
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_initialize");

    for &n in &[60u32, 240] {
        let mut plan = Plan::new();
        for (idx, item) in catalog(n).into_iter().enumerate() {
            let start = i64::try_from(idx).unwrap_or(0) * 7;
            let _ = plan.add(Arc::new(item), start);
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &plan, |b, plan| {
            b.iter(|| {
                let mut tracker = ViolationTracker::new(constraints());
                tracker.initialize(black_box(plan));
                black_box(tracker.total_score())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_schedule, bench_initialize);
criterion_main!(benches);
