use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::{
    MAX_ADJUSTMENTS_PER_REQUEST, MAX_COVERAGE_SPECS, MAX_VALID_DAY, MIN_VALID_DAY,
};
use crate::model::*;
use crate::notify;
use crate::observability;
use crate::timeline::ShiftTimeline;

use super::registry::can_transition;
use super::{Engine, EngineError, check_note_len, impact, persistence};

// ── Request / result types ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAdjustment {
    pub shift_id: Ulid,
    pub new_start_min: Option<Minutes>,
    pub new_end_min: Option<Minutes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShiftSpec {
    pub employee_id: Ulid,
    pub day: Day,
    pub start_min: Minutes,
    pub end_min: Minutes,
    pub notes: Option<String>,
}

/// One typed variant per strategy. The variant is the dispatch tag; adding a
/// strategy means the compiler walks every match below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionPayload {
    AdjustTimes {
        adjustments: Vec<ShiftAdjustment>,
    },
    ReassignEmployee {
        shift_id: Ulid,
        new_employee_id: Ulid,
    },
    SplitShift {
        shift_id: Ulid,
        split_min: Minutes,
    },
    AddCoverage {
        shifts: Vec<NewShiftSpec>,
    },
    RemoveShift {
        shift_id: Ulid,
    },
    OverrideConstraint {
        constraint_id: Ulid,
        reason: String,
    },
    AddRestDay {
        employee_id: Ulid,
        day: Day,
    },
    Custom {
        action: String,
        notes: Option<String>,
    },
}

impl ResolutionPayload {
    pub fn kind(&self) -> ResolutionKind {
        match self {
            ResolutionPayload::AdjustTimes { .. } => ResolutionKind::AdjustTimes,
            ResolutionPayload::ReassignEmployee { .. } => ResolutionKind::ReassignEmployee,
            ResolutionPayload::SplitShift { .. } => ResolutionKind::SplitShift,
            ResolutionPayload::AddCoverage { .. } => ResolutionKind::AddCoverage,
            ResolutionPayload::RemoveShift { .. } => ResolutionKind::RemoveShift,
            ResolutionPayload::OverrideConstraint { .. } => ResolutionKind::OverrideConstraint,
            ResolutionPayload::AddRestDay { .. } => ResolutionKind::AddRestDay,
            ResolutionPayload::Custom { .. } => ResolutionKind::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub payload: ResolutionPayload,
    pub apply_immediately: bool,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionFailure {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub success: bool,
    pub resolution_type: ResolutionKind,
    pub error: Option<ResolutionFailure>,
    /// Echo of what would (preview) or did (commit) change.
    pub details: Value,
}

/// A validated, not-yet-committed resolution: the change events plus the
/// details map both modes share.
struct Plan {
    changes: Vec<ChangeEvent>,
    details: Map<String, Value>,
    note: String,
}

impl Engine {
    /// Execute one resolution strategy against one conflict. Preview mode
    /// computes the same plan as commit mode but persists nothing; commit
    /// mode lands the plan and the conflict's Resolved transition in a
    /// single transactional unit.
    pub async fn resolve(&self, conflict_id: Ulid, request: ResolutionRequest) -> ResolutionResult {
        let kind = request.payload.kind();
        let mode = if request.apply_immediately {
            "apply"
        } else {
            "preview"
        };
        match self.try_resolve(conflict_id, &request).await {
            Ok(result) => {
                metrics::counter!(
                    observability::RESOLUTIONS_TOTAL,
                    "kind" => kind.as_str(),
                    "mode" => mode
                )
                .increment(1);
                result
            }
            Err(e) => {
                metrics::counter!(
                    observability::RESOLUTION_FAILURES_TOTAL,
                    "kind" => kind.as_str()
                )
                .increment(1);
                warn!(conflict = %conflict_id, kind = kind.as_str(), error = %e, "resolution failed");
                ResolutionResult {
                    success: false,
                    resolution_type: kind,
                    error: Some(ResolutionFailure {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }),
                    details: Value::Object(Map::new()),
                }
            }
        }
    }

    async fn try_resolve(
        &self,
        conflict_id: Ulid,
        request: &ResolutionRequest,
    ) -> Result<ResolutionResult, EngineError> {
        let conflict = self.require_conflict(conflict_id).await?;
        if !can_transition(conflict.status, ConflictStatus::Resolved) {
            return Err(EngineError::BusinessRule(format!(
                "conflict {conflict_id} is {}, only open conflicts can be resolved",
                conflict.status.as_str()
            )));
        }

        let mut plan = self.plan(&conflict, &request.payload).await?;
        let kind = request.payload.kind();
        plan.details
            .insert("resolution_type".into(), json!(kind.as_str()));
        plan.details
            .insert("conflict_id".into(), json!(conflict_id.to_string()));

        if !request.apply_immediately {
            plan.details.insert("preview".into(), json!(true));
            plan.details.insert(
                "impact".into(),
                serde_json::to_value(impact::estimate(&request.payload))
                    .unwrap_or(Value::Null),
            );
            return Ok(ResolutionResult {
                success: true,
                resolution_type: kind,
                error: None,
                details: Value::Object(plan.details),
            });
        }

        let now = self.clock.now_ms();
        let mut changes = plan.changes;
        changes.push(ChangeEvent::ConflictStatusChanged {
            conflict_id,
            status: ConflictStatus::Resolved,
            resolution_notes: Some(plan.note.clone()),
            resolved_at: Some(now),
            resolved_by: request.actor.clone(),
        });
        self.store.commit(&changes).await.map_err(persistence)?;

        self.notify.emit(
            conflict.schedule_id,
            notify::CONFLICT_RESOLVED,
            json!({
                "conflict_id": conflict_id.to_string(),
                "schedule_id": conflict.schedule_id.to_string(),
                "resolution_type": kind.as_str(),
                "actor": request.actor,
            }),
        );
        info!(
            conflict = %conflict_id,
            kind = kind.as_str(),
            changes = changes.len(),
            "resolution applied"
        );

        plan.details.insert("preview".into(), json!(false));
        Ok(ResolutionResult {
            success: true,
            resolution_type: kind,
            error: None,
            details: Value::Object(plan.details),
        })
    }

    async fn plan(
        &self,
        conflict: &Conflict,
        payload: &ResolutionPayload,
    ) -> Result<Plan, EngineError> {
        match payload {
            ResolutionPayload::AdjustTimes { adjustments } => {
                self.plan_adjust_times(conflict, adjustments).await
            }
            ResolutionPayload::ReassignEmployee {
                shift_id,
                new_employee_id,
            } => self.plan_reassign(conflict, *shift_id, *new_employee_id).await,
            ResolutionPayload::SplitShift {
                shift_id,
                split_min,
            } => self.plan_split(*shift_id, *split_min).await,
            ResolutionPayload::AddCoverage { shifts } => {
                self.plan_add_coverage(conflict, shifts).await
            }
            ResolutionPayload::RemoveShift { shift_id } => self.plan_remove(*shift_id).await,
            ResolutionPayload::OverrideConstraint {
                constraint_id,
                reason,
            } => self.plan_override(conflict, *constraint_id, reason).await,
            ResolutionPayload::AddRestDay { employee_id, day } => {
                self.plan_add_rest_day(conflict, *employee_id, *day).await
            }
            ResolutionPayload::Custom { action, notes } => plan_custom(action, notes.as_deref()),
        }
    }

    /// Set override times on the named shifts. A named shift that no longer
    /// exists is skipped, not an error.
    async fn plan_adjust_times(
        &self,
        conflict: &Conflict,
        adjustments: &[ShiftAdjustment],
    ) -> Result<Plan, EngineError> {
        if adjustments.is_empty() {
            return Err(EngineError::Validation(
                "no shift adjustments provided".into(),
            ));
        }
        if adjustments.len() > MAX_ADJUSTMENTS_PER_REQUEST {
            return Err(EngineError::LimitExceeded("too many shift adjustments"));
        }

        let mut changes = Vec::new();
        let mut adjusted = Vec::new();
        let mut skipped = Vec::new();
        for adjustment in adjustments {
            if adjustment.new_start_min.is_none() && adjustment.new_end_min.is_none() {
                return Err(EngineError::Validation(format!(
                    "adjustment for shift {} changes nothing",
                    adjustment.shift_id
                )));
            }
            for m in [adjustment.new_start_min, adjustment.new_end_min].into_iter().flatten() {
                if !valid_minute_of_day(m) {
                    return Err(EngineError::Validation(format!(
                        "minute-of-day {m} out of range"
                    )));
                }
            }
            let Some(shift) = self.store.shift(adjustment.shift_id).await.map_err(persistence)?
            else {
                skipped.push(adjustment.shift_id.to_string());
                continue;
            };
            let new_start = adjustment
                .new_start_min
                .unwrap_or_else(|| shift.effective_start_min());
            let new_end = adjustment
                .new_end_min
                .unwrap_or_else(|| shift.effective_end_min());
            if wrapped_duration(new_start, new_end) == 0 {
                return Err(EngineError::Validation(format!(
                    "shift {} would have zero duration",
                    adjustment.shift_id
                )));
            }
            changes.push(ChangeEvent::ShiftTimesAdjusted {
                shift_id: adjustment.shift_id,
                new_start_min: adjustment.new_start_min,
                new_end_min: adjustment.new_end_min,
                reason: format!("times adjusted to resolve conflict {}", conflict.id),
            });
            adjusted.push(json!({
                "shift_id": adjustment.shift_id.to_string(),
                "new_start_min": adjustment.new_start_min,
                "new_end_min": adjustment.new_end_min,
            }));
        }

        let mut details = Map::new();
        details.insert("adjusted".into(), Value::Array(adjusted));
        details.insert("skipped_shift_ids".into(), json!(skipped));
        Ok(Plan {
            note: format!("adjust_times: {} shift(s) adjusted", changes.len()),
            changes,
            details,
        })
    }

    /// Move one shift to a different employee. Fails if the target does not
    /// exist, is inactive, or already works an overlapping shift that day.
    async fn plan_reassign(
        &self,
        conflict: &Conflict,
        shift_id: Ulid,
        new_employee_id: Ulid,
    ) -> Result<Plan, EngineError> {
        let shift = self.require_shift(shift_id).await?;
        let employee = self.require_employee(new_employee_id).await?;
        if !employee.active {
            return Err(EngineError::BusinessRule(format!(
                "employee {new_employee_id} is inactive"
            )));
        }

        let schedule_shifts = self
            .store
            .shifts_for_schedule(conflict.schedule_id)
            .await
            .map_err(persistence)?;
        let timeline = ShiftTimeline::build(&schedule_shifts);
        let span = shift.effective_span();
        if let Some(existing) = timeline.first_overlap(&new_employee_id, &span, Some(shift_id)) {
            return Err(EngineError::BusinessRule(format!(
                "employee {new_employee_id} already has overlapping shift {} on day {}",
                existing.shift_id, existing.day
            )));
        }

        let mut details = Map::new();
        details.insert("shift_id".into(), json!(shift_id.to_string()));
        details.insert(
            "from_employee_id".into(),
            json!(shift.employee_id.to_string()),
        );
        details.insert("to_employee_id".into(), json!(new_employee_id.to_string()));
        details.insert("day".into(), json!(shift.day));
        Ok(Plan {
            changes: vec![ChangeEvent::ShiftReassigned {
                shift_id,
                new_employee_id,
            }],
            details,
            note: format!("reassign_employee: shift {shift_id} moved to {new_employee_id}"),
        })
    }

    /// Split one shift at a boundary strictly inside its effective range.
    /// The original keeps `[start, split)`, the new shift covers
    /// `[split, end)` with the same employee and status.
    async fn plan_split(&self, shift_id: Ulid, split_min: Minutes) -> Result<Plan, EngineError> {
        let shift = self.require_shift(shift_id).await?;
        if !valid_minute_of_day(split_min) {
            return Err(EngineError::Validation(format!(
                "split minute {split_min} out of range"
            )));
        }
        let start = shift.effective_start_min();
        let end = shift.effective_end_min();
        let duration = wrapped_duration(start, end);
        let split_offset = wrapped_duration(start, split_min);
        if split_offset == 0 || split_offset >= duration {
            return Err(EngineError::Validation(format!(
                "split time {} is not strictly between {} and {}",
                fmt_hm(split_min),
                fmt_hm(start),
                fmt_hm(end)
            )));
        }

        // A split past midnight lands the tail on the following day.
        let tail_day = if split_min > start {
            shift.day
        } else {
            shift.day + 1
        };
        let tail = ShiftAssignment {
            id: self.ids.next_id(),
            schedule_id: shift.schedule_id,
            employee_id: shift.employee_id,
            day: tail_day,
            start_min: split_min,
            end_min: end,
            override_start_min: None,
            override_end_min: None,
            status: shift.status,
            notes: shift.notes.clone(),
        };

        let mut details = Map::new();
        details.insert("original_shift_id".into(), json!(shift_id.to_string()));
        details.insert("new_shift_id".into(), json!(tail.id.to_string()));
        details.insert("split_min".into(), json!(split_min));
        details.insert(
            "original_range".into(),
            json!([start, split_min]),
        );
        details.insert("new_range".into(), json!([split_min, end]));
        Ok(Plan {
            changes: vec![
                ChangeEvent::ShiftTruncated {
                    shift_id,
                    new_end_min: split_min,
                },
                ChangeEvent::ShiftCreated { shift: tail },
            ],
            details,
            note: format!("split_shift: shift {shift_id} split at {}", fmt_hm(split_min)),
        })
    }

    /// Create shifts from the provided specs. Malformed specs are skipped;
    /// a request with no usable spec is a validation error.
    async fn plan_add_coverage(
        &self,
        conflict: &Conflict,
        specs: &[NewShiftSpec],
    ) -> Result<Plan, EngineError> {
        if specs.len() > MAX_COVERAGE_SPECS {
            return Err(EngineError::LimitExceeded("too many coverage specs"));
        }

        let mut changes = Vec::new();
        let mut created = Vec::new();
        let mut skipped = 0usize;
        for spec in specs {
            let employee_known = self
                .store
                .employee(spec.employee_id)
                .await
                .map_err(persistence)?
                .is_some();
            let well_formed = employee_known
                && (MIN_VALID_DAY..=MAX_VALID_DAY).contains(&spec.day)
                && valid_minute_of_day(spec.start_min)
                && valid_minute_of_day(spec.end_min)
                && wrapped_duration(spec.start_min, spec.end_min) > 0;
            if !well_formed {
                skipped += 1;
                continue;
            }
            let shift = ShiftAssignment {
                id: self.ids.next_id(),
                schedule_id: conflict.schedule_id,
                employee_id: spec.employee_id,
                day: spec.day,
                start_min: spec.start_min,
                end_min: spec.end_min,
                override_start_min: None,
                override_end_min: None,
                status: ShiftStatus::Assigned,
                notes: spec.notes.clone(),
            };
            created.push(json!({
                "shift_id": shift.id.to_string(),
                "employee_id": spec.employee_id.to_string(),
                "day": spec.day,
                "start_min": spec.start_min,
                "end_min": spec.end_min,
            }));
            changes.push(ChangeEvent::ShiftCreated { shift });
        }
        if changes.is_empty() {
            return Err(EngineError::Validation(
                "no valid coverage shift specs provided".into(),
            ));
        }

        let mut details = Map::new();
        details.insert("created".into(), Value::Array(created));
        details.insert("skipped".into(), json!(skipped));
        Ok(Plan {
            note: format!("add_coverage: {} shift(s) created", changes.len()),
            changes,
            details,
        })
    }

    /// Delete one shift, echoing its pre-delete snapshot.
    async fn plan_remove(&self, shift_id: Ulid) -> Result<Plan, EngineError> {
        let shift = self.require_shift(shift_id).await?;
        let mut details = Map::new();
        details.insert(
            "removed".into(),
            serde_json::to_value(shift.snapshot()).unwrap_or(Value::Null),
        );
        Ok(Plan {
            changes: vec![ChangeEvent::ShiftRemoved { shift_id }],
            details,
            note: format!("remove_shift: shift {shift_id} removed"),
        })
    }

    /// Annotate a soft constraint with an override note. Hard constraints
    /// can never be overridden, regardless of who asks.
    async fn plan_override(
        &self,
        conflict: &Conflict,
        constraint_id: Ulid,
        reason: &str,
    ) -> Result<Plan, EngineError> {
        check_note_len(reason)?;
        if reason.trim().is_empty() {
            return Err(EngineError::Validation(
                "override reason must not be empty".into(),
            ));
        }
        let constraint = self.require_constraint(constraint_id).await?;
        if constraint.is_hard {
            return Err(EngineError::BusinessRule(format!(
                "constraint {constraint_id} is hard and cannot be overridden"
            )));
        }

        let note = format!("[override] {reason} (conflict {})", conflict.id);
        let mut details = Map::new();
        details.insert("constraint_id".into(), json!(constraint_id.to_string()));
        details.insert("annotation".into(), json!(note));
        Ok(Plan {
            changes: vec![ChangeEvent::ConstraintAnnotated {
                constraint_id,
                note,
            }],
            details,
            note: format!("override_constraint: constraint {constraint_id} overridden"),
        })
    }

    /// Delete every shift the employee holds on one day of the conflict's
    /// schedule. Zero matches is a valid no-op.
    async fn plan_add_rest_day(
        &self,
        conflict: &Conflict,
        employee_id: Ulid,
        day: Day,
    ) -> Result<Plan, EngineError> {
        let schedule_shifts = self
            .store
            .shifts_for_schedule(conflict.schedule_id)
            .await
            .map_err(persistence)?;
        let removed: Vec<Ulid> = schedule_shifts
            .iter()
            .filter(|s| s.employee_id == employee_id && s.day == day)
            .map(|s| s.id)
            .collect();

        let changes = removed
            .iter()
            .map(|id| ChangeEvent::ShiftRemoved { shift_id: *id })
            .collect();
        let mut details = Map::new();
        details.insert("employee_id".into(), json!(employee_id.to_string()));
        details.insert("day".into(), json!(day));
        details.insert(
            "removed_shift_ids".into(),
            json!(removed.iter().map(|id| id.to_string()).collect::<Vec<_>>()),
        );
        Ok(Plan {
            changes,
            details,
            note: format!(
                "add_rest_day: {} shift(s) cleared for employee {employee_id} on day {day}",
                removed.len()
            ),
        })
    }
}

/// Record a free-form action. No state mutation beyond the conflict itself.
fn plan_custom(action: &str, notes: Option<&str>) -> Result<Plan, EngineError> {
    check_note_len(action)?;
    if let Some(notes) = notes {
        check_note_len(notes)?;
    }
    if action.trim().is_empty() {
        return Err(EngineError::Validation("custom action must not be empty".into()));
    }
    let mut details = Map::new();
    details.insert("action".into(), json!(action));
    details.insert("notes".into(), json!(notes));
    Ok(Plan {
        changes: Vec::new(),
        details,
        note: format!("custom: {action}"),
    })
}

fn fmt_hm(m: Minutes) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}
