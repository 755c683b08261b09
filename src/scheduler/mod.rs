//! Repair scheduler and plan metrics.
//!
//! Drives the seed → repair → escape loop over a [`ViolationTracker`]
//! and a [`ConfigurationSelector`], and reports plan quality.
//!
//! # Algorithm
//!
//! `RepairScheduler` is a min-conflicts local search. It is not optimal and
//! may fail on instances that are feasible.
//!
//! # KPI
//!
//! `PlanKpi` computes makespan and lane utilization of a plan.
//!
//! # References
//!
//! - Minton et al. (1992), "Minimizing conflicts: a heuristic repair method"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1-2
//!
//! [`ViolationTracker`]: crate::tracker::ViolationTracker
//! [`ConfigurationSelector`]: crate::selector::ConfigurationSelector

mod config;
mod escape;
mod kpi;
mod repair;
mod seed;

pub use config::{SchedulerConfig, SeedOrder};
pub use kpi::PlanKpi;
pub use repair::{RepairScheduler, ScheduleOutcome, Snapshot};
