//! Constraint-based heuristic repair scheduling.
//!
//! Assigns start times to indivisible work items that each occupy one or
//! more parallel lanes for a lane-specific duration, satisfying pluggable
//! hard and soft constraints while keeping the makespan short.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Lane`, `Item`, `ScheduledItem`, `Plan`
//! - **`constraint`**: Constraint contract (`SingleItemConstraint`,
//!   `PairConstraint`, `Score`) and reference constraints
//! - **`predictor`**: Conflict curves per item, interned and merged in parallel
//! - **`tracker`**: Incremental violation scores and the worst-first index
//! - **`selector`**: Best-move and best-plan selection
//! - **`scheduler`**: The repair loop (`RepairScheduler`), configuration, KPIs
//! - **`validation`**: Input integrity checks (duplicate IDs, requirement cycles)
//!
//! # Example
//!
//! ```
//! use u_repair::constraint::{ConstraintSet, Dependency, NoOverlap, StartAsap};
//! use u_repair::models::{Item, Lane};
//! use u_repair::scheduler::RepairScheduler;
//!
//! let a = Item::on_lane(1, Lane::new(0), 100).unwrap();
//! let b = Item::on_lane(2, Lane::new(0), 100).unwrap().with_required(1);
//!
//! let constraints = ConstraintSet::new()
//!     .with_single(StartAsap)
//!     .with_pair(NoOverlap)
//!     .with_pair(Dependency);
//! let outcome = RepairScheduler::new(constraints)
//!     .schedule(&[b, a], &[])
//!     .unwrap();
//!
//! assert_eq!(outcome.assignments()[&1], 0);
//! assert_eq!(outcome.assignments()[&2], 100);
//! ```
//!
//! # References
//!
//! - Minton et al. (1992), "Minimizing conflicts: a heuristic repair method
//!   for constraint satisfaction and scheduling problems"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod constraint;
pub mod error;
pub mod models;
pub mod predictor;
pub mod scheduler;
pub mod selector;
pub mod tracker;
pub mod validation;

pub use error::ScheduleError;
