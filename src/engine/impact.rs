//! Heuristic impact scoring for resolution previews. Advisory only — the
//! numbers are payload counts plus fixed per-strategy deltas, never a
//! promise about what a commit will actually do.

use std::collections::HashSet;

use serde::Serialize;

use super::resolve::ResolutionPayload;
use super::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactEstimate {
    pub employees_affected: usize,
    pub shifts_modified: usize,
    pub cost_impact: f64,
    pub coverage_impact: f64,
    pub satisfaction_impact: f64,
}

pub(super) fn estimate(payload: &ResolutionPayload) -> ImpactEstimate {
    match payload {
        ResolutionPayload::AdjustTimes { adjustments } => {
            let n = adjustments.len();
            ImpactEstimate {
                employees_affected: n,
                shifts_modified: n,
                cost_impact: 0.0,
                coverage_impact: -0.1 * n as f64,
                satisfaction_impact: -0.1 * n as f64,
            }
        }
        ResolutionPayload::ReassignEmployee { .. } => ImpactEstimate {
            employees_affected: 2,
            shifts_modified: 1,
            cost_impact: 0.0,
            coverage_impact: 0.0,
            satisfaction_impact: -0.25,
        },
        ResolutionPayload::SplitShift { .. } => ImpactEstimate {
            employees_affected: 1,
            shifts_modified: 2,
            cost_impact: 0.1,
            coverage_impact: 0.1,
            satisfaction_impact: -0.15,
        },
        ResolutionPayload::AddCoverage { shifts } => {
            let employees: HashSet<_> = shifts.iter().map(|s| s.employee_id).collect();
            let n = shifts.len();
            ImpactEstimate {
                employees_affected: employees.len(),
                shifts_modified: n,
                cost_impact: 1.0 * n as f64,
                coverage_impact: 0.5 * n as f64,
                satisfaction_impact: 0.1,
            }
        }
        ResolutionPayload::RemoveShift { .. } => ImpactEstimate {
            employees_affected: 1,
            shifts_modified: 1,
            cost_impact: -1.0,
            coverage_impact: -0.5,
            satisfaction_impact: 0.0,
        },
        ResolutionPayload::OverrideConstraint { .. } => ImpactEstimate {
            employees_affected: 1,
            shifts_modified: 0,
            cost_impact: 0.0,
            coverage_impact: 0.0,
            satisfaction_impact: -0.3,
        },
        ResolutionPayload::AddRestDay { .. } => ImpactEstimate {
            employees_affected: 1,
            shifts_modified: 1,
            cost_impact: -0.5,
            coverage_impact: -0.3,
            satisfaction_impact: 0.4,
        },
        ResolutionPayload::Custom { .. } => ImpactEstimate {
            employees_affected: 0,
            shifts_modified: 0,
            cost_impact: 0.0,
            coverage_impact: 0.0,
            satisfaction_impact: 0.0,
        },
    }
}

impl Engine {
    pub fn estimate_impact(&self, payload: &ResolutionPayload) -> ImpactEstimate {
        estimate(payload)
    }
}
