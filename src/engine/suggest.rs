//! Maps a conflict's kind and severity to ranked candidate strategies.
//! Pure — no store access, no side effects.

use serde::Serialize;
use ulid::Ulid;

use crate::model::{Conflict, ConflictKind, ResolutionKind, Severity};

use super::{Engine, EngineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub kind: ResolutionKind,
    pub title: String,
    pub description: String,
    pub complexity: &'static str,
    pub impact: &'static str,
}

pub(super) fn suggestions_for(conflict: &Conflict) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    match conflict.kind {
        ConflictKind::Overlap => {
            suggestions.push(Suggestion {
                kind: ResolutionKind::AdjustTimes,
                title: "Adjust shift times".into(),
                description: "Trim one of the overlapping shifts so the two no longer intersect"
                    .into(),
                complexity: "low",
                impact: "low",
            });
            suggestions.push(Suggestion {
                kind: ResolutionKind::ReassignEmployee,
                title: "Reassign a shift".into(),
                description: "Move one of the overlapping shifts to another employee".into(),
                complexity: "medium",
                impact: "medium",
            });
            suggestions.push(Suggestion {
                kind: ResolutionKind::SplitShift,
                title: "Split a shift".into(),
                description: "Split the longer shift at the overlap boundary".into(),
                complexity: "medium",
                impact: "low",
            });
        }
        ConflictKind::Coverage => {
            suggestions.push(Suggestion {
                kind: ResolutionKind::AddCoverage,
                title: "Add coverage".into(),
                description: "Schedule additional employees on the understaffed day".into(),
                complexity: "low",
                impact: "high",
            });
            suggestions.push(Suggestion {
                kind: ResolutionKind::AdjustTimes,
                title: "Extend existing shifts".into(),
                description: "Lengthen adjacent shifts to cover the gap".into(),
                complexity: "medium",
                impact: "medium",
            });
        }
        ConflictKind::Rule => {
            if conflict.description.contains("consecutive") {
                suggestions.push(Suggestion {
                    kind: ResolutionKind::AddRestDay,
                    title: "Add a rest day".into(),
                    description: "Clear one day in the middle of the run to break it up".into(),
                    complexity: "low",
                    impact: "medium",
                });
            }
            if conflict.severity != Severity::Critical {
                suggestions.push(Suggestion {
                    kind: ResolutionKind::OverrideConstraint,
                    title: "Override with a reason".into(),
                    description: "Accept the violation and record why".into(),
                    complexity: "low",
                    impact: "low",
                });
            }
        }
        ConflictKind::Constraint => {}
    }

    // Always available, always last.
    suggestions.push(Suggestion {
        kind: ResolutionKind::Custom,
        title: "Custom resolution".into(),
        description: "Record a manual action taken outside the scheduler".into(),
        complexity: "high",
        impact: "unknown",
    });

    suggestions
}

impl Engine {
    pub async fn suggest(&self, conflict_id: Ulid) -> Result<Vec<Suggestion>, EngineError> {
        let conflict = self.require_conflict(conflict_id).await?;
        Ok(suggestions_for(&conflict))
    }
}
