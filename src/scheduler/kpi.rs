//! Plan quality metrics (KPIs).
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest boundary time |
//! | Lane Busy Time | Sum of durations placed on the lane |
//! | Lane Utilization | Busy time / makespan |
//! | Avg Utilization | Mean lane utilization |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Lane, Plan};

/// Plan performance indicators. Time values are in plan time units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanKpi {
    /// Latest boundary time.
    pub makespan: i64,
    /// Per-lane busy time.
    pub busy_by_lane: BTreeMap<Lane, i64>,
    /// Per-lane utilization (busy / makespan).
    pub utilization_by_lane: BTreeMap<Lane, f64>,
    /// Average lane utilization.
    pub avg_utilization: f64,
    /// Placed items, fixed ones included.
    pub item_count: usize,
    /// Fixed items.
    pub fixed_count: usize,
}

impl PlanKpi {
    /// Computes KPIs from a plan.
    pub fn calculate(plan: &Plan) -> Self {
        let busy_by_lane: BTreeMap<Lane, i64> = plan
            .lanes()
            .into_iter()
            .map(|lane| (lane, plan.lane_busy_time(lane)))
            .collect();

        let utilization_by_lane = plan.all_utilizations();
        let avg_utilization = if utilization_by_lane.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_lane.values().sum();
            sum / utilization_by_lane.len() as f64
        };

        Self {
            makespan: plan.makespan(),
            busy_by_lane,
            utilization_by_lane,
            avg_utilization,
            item_count: plan.len(),
            fixed_count: plan.fixed_ids().count(),
        }
    }

    /// Whether the plan meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_makespan: i64, min_utilization: f64) -> bool {
        self.makespan <= max_makespan && self.avg_utilization >= min_utilization
    }
}
