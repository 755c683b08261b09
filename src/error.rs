//! Error types.
//!
//! Only [`ScheduleError::InvalidItem`] (construction time) and
//! [`ScheduleError::SchedulingFailed`] (terminal) are expected at runtime.
//! [`ScheduleError::IllegalPlanOperation`] signals a caller or programming
//! error and is never recovered locally.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::models::{ItemId, Lane};
use crate::validation::ValidationError;

/// Errors raised by item construction, plan mutation and scheduling.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// An item was constructed with an invalid duration profile.
    #[error("invalid item {id}: {reason}")]
    InvalidItem { id: ItemId, reason: InvalidItemReason },

    /// A plan mutation was attempted that the plan's invariants forbid.
    #[error("illegal {op} on item {id}: {reason}")]
    IllegalPlanOperation {
        id: ItemId,
        op: PlanOperation,
        reason: PlanViolation,
    },

    /// The item catalog failed validation.
    #[error("input validation failed with {} error(s)", .0.len())]
    InvalidInput(Vec<ValidationError>),

    /// The dedicated merge pool could not be created.
    #[error("failed to build merge worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The repair loop gave up. `assignments` is the item → start mapping
    /// of the working plan at the time of failure.
    #[error("scheduling failed: {reason}")]
    SchedulingFailed {
        reason: FailureReason,
        assignments: BTreeMap<ItemId, i64>,
    },
}

/// A candidate placement is not better than the reference placement.
///
/// Control-flow signal between the tracker and the configuration selector;
/// never surfaces from a scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("candidate placement does not improve on the reference")]
pub struct UpdateRejected;

/// Why an item was rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidItemReason {
    /// The item occupies no lane.
    NoLanes,
    /// A lane duration is zero or negative.
    NonPositiveDuration { lane: Lane, duration: i64 },
}

impl fmt::Display for InvalidItemReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLanes => write!(f, "item occupies no lane"),
            Self::NonPositiveDuration { lane, duration } => {
                write!(f, "duration {duration} on {lane} is not positive")
            }
        }
    }
}

/// Plan mutations that can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOperation {
    Insert,
    Move,
    Unschedule,
    Fixate,
}

impl fmt::Display for PlanOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Move => "move",
            Self::Unschedule => "unschedule",
            Self::Fixate => "fixate",
        };
        f.write_str(name)
    }
}

/// The invariant a rejected plan mutation would have broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanViolation {
    NotScheduled,
    AlreadyScheduled,
    Fixed,
}

impl fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotScheduled => "item is not scheduled",
            Self::AlreadyScheduled => "item is already scheduled",
            Self::Fixed => "item is fixed",
        };
        f.write_str(text)
    }
}

/// Terminal failure causes of a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// None of the escape strategies produced a strictly better plan.
    LocalOptimum { worst: ItemId },
    /// Push-and-lock reached an item that was already locked.
    CircularConstraint {
        locked: Vec<ItemId>,
        conflicting: Vec<ItemId>,
    },
    /// Fixed items violate hard constraints among themselves.
    FixedItemsConflict { items: Vec<ItemId> },
    /// The configured iteration budget ran out.
    IterationLimit { limit: usize },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalOptimum { worst } => write!(
                f,
                "no escape strategy improved the plan (worst violator: item {worst})"
            ),
            Self::CircularConstraint {
                locked,
                conflicting,
            } => write!(
                f,
                "circular hard constraint: items {conflicting:?} conflict with locked items {locked:?}"
            ),
            Self::FixedItemsConflict { items } => {
                write!(f, "fixed items {items:?} violate hard constraints")
            }
            Self::IterationLimit { limit } => {
                write!(f, "iteration limit of {limit} exhausted")
            }
        }
    }
}
