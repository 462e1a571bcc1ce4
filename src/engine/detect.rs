use std::collections::HashMap;

use tracing::info;
use ulid::Ulid;

use crate::clock::IdSource;
use crate::limits::MAX_SHIFTS_PER_SCHEDULE;
use crate::model::*;
use crate::notify;
use crate::observability;
use crate::timeline::{ShiftTimeline, TimelineEntry};

use super::{Engine, EngineError, persistence};

/// Everything a detection pass reads. Assembled by the engine from the
/// store; pure detection below never touches persistence.
pub struct DetectionInput<'a> {
    pub schedule_id: Ulid,
    pub shifts: &'a [ShiftAssignment],
    pub employees: &'a [Employee],
    pub rules: &'a [Rule],
    pub constraints: &'a [Constraint],
}

impl Engine {
    /// Run all four checks over a schedule, persist the new conflicts, and
    /// announce them. Prior conflicts are left untouched — whether to clear
    /// them first is the caller's decision.
    pub async fn detect_conflicts(
        &self,
        schedule_id: Ulid,
        org_id: Ulid,
    ) -> Result<DetectionOutcome, EngineError> {
        let started = self.clock.now_ms();

        let shifts = self
            .store
            .shifts_for_schedule(schedule_id)
            .await
            .map_err(persistence)?;
        if shifts.len() > MAX_SHIFTS_PER_SCHEDULE {
            return Err(EngineError::LimitExceeded("too many shifts in schedule"));
        }

        let mut employee_ids: Vec<Ulid> = shifts.iter().map(|s| s.employee_id).collect();
        employee_ids.sort();
        employee_ids.dedup();

        let employees = self
            .store
            .employees(&employee_ids)
            .await
            .map_err(persistence)?;
        let rules = self.store.active_rules(org_id).await.map_err(persistence)?;
        let constraints = self
            .store
            .active_constraints_for(&employee_ids)
            .await
            .map_err(persistence)?;

        let input = DetectionInput {
            schedule_id,
            shifts: &shifts,
            employees: &employees,
            rules: &rules,
            constraints: &constraints,
        };
        let (conflicts, diagnostics) = run_detection(
            &input,
            self.config.min_daily_coverage,
            started,
            self.ids.as_ref(),
        );

        self.store
            .insert_conflicts(&conflicts)
            .await
            .map_err(persistence)?;

        let finished = self.clock.now_ms();
        let summary = summarize(&conflicts, finished - started);

        for conflict in &conflicts {
            metrics::counter!(
                observability::CONFLICTS_DETECTED_TOTAL,
                "kind" => conflict.kind.as_str(),
                "severity" => conflict.severity.as_str()
            )
            .increment(1);
            self.notify.emit(
                schedule_id,
                notify::CONFLICT_DETECTED,
                serde_json::json!({
                    "conflict_id": conflict.id.to_string(),
                    "schedule_id": schedule_id.to_string(),
                    "kind": conflict.kind.as_str(),
                    "severity": conflict.severity.as_str(),
                    "title": conflict.title,
                }),
            );
        }
        metrics::counter!(observability::DETECTIONS_TOTAL).increment(1);
        metrics::counter!(observability::DETECTION_DIAGNOSTICS_TOTAL)
            .increment(diagnostics.len() as u64);
        metrics::histogram!(observability::DETECTION_DURATION_SECONDS)
            .record(summary.detection_time_ms as f64 / 1000.0);

        info!(
            schedule = %schedule_id,
            found = summary.conflicts_found,
            diagnostics = diagnostics.len(),
            "detection pass complete"
        );

        Ok(DetectionOutcome {
            summary,
            conflicts,
            diagnostics,
        })
    }
}

/// Pure detection pass: overlap, coverage, rule, constraint — in that order.
/// A malformed rule or constraint becomes a diagnostic, never an abort.
pub fn run_detection(
    input: &DetectionInput<'_>,
    min_daily_coverage: usize,
    now: Ms,
    ids: &dyn IdSource,
) -> (Vec<Conflict>, Vec<DetectionDiagnostic>) {
    let timeline = ShiftTimeline::build(input.shifts);
    let by_id: HashMap<Ulid, &ShiftAssignment> =
        input.shifts.iter().map(|s| (s.id, s)).collect();
    let employees: HashMap<Ulid, &Employee> =
        input.employees.iter().map(|e| (e.id, e)).collect();

    let mut conflicts = Vec::new();
    let mut diagnostics = Vec::new();

    check_overlaps(input.schedule_id, &timeline, &by_id, now, ids, &mut conflicts);
    check_coverage(
        input.schedule_id,
        &timeline,
        &by_id,
        min_daily_coverage,
        now,
        ids,
        &mut conflicts,
    );
    check_rules(
        input.schedule_id,
        &timeline,
        &by_id,
        &employees,
        input.rules,
        now,
        ids,
        &mut conflicts,
        &mut diagnostics,
    );
    check_constraints(
        input.schedule_id,
        input.shifts,
        input.constraints,
        now,
        ids,
        &mut conflicts,
        &mut diagnostics,
    );

    (conflicts, diagnostics)
}

fn summarize(conflicts: &[Conflict], detection_time_ms: Ms) -> DetectionSummary {
    let mut summary = DetectionSummary {
        conflicts_found: conflicts.len(),
        detection_time_ms,
        ..Default::default()
    };
    for conflict in conflicts {
        match conflict.severity {
            Severity::Critical => summary.critical += 1,
            Severity::Major => summary.major += 1,
            Severity::Minor => summary.minor += 1,
            Severity::Warning => summary.warnings += 1,
        }
    }
    summary
}

fn new_conflict(
    schedule_id: Ulid,
    kind: ConflictKind,
    severity: Severity,
    title: String,
    description: String,
    employee_ids: Vec<Ulid>,
    shifts: Vec<ShiftSnapshot>,
    days: Vec<Day>,
    hint: Option<SuggestionHint>,
    now: Ms,
    ids: &dyn IdSource,
) -> Conflict {
    Conflict {
        id: ids.next_id(),
        schedule_id,
        kind,
        severity,
        title,
        description,
        employee_ids,
        shifts,
        days,
        status: ConflictStatus::Open,
        suggested_resolution: hint,
        resolution_notes: None,
        detected_at: now,
        resolved_at: None,
        resolved_by: None,
    }
}

fn snapshot_of(by_id: &HashMap<Ulid, &ShiftAssignment>, entry: &TimelineEntry) -> ShiftSnapshot {
    by_id
        .get(&entry.shift_id)
        .map(|s| s.snapshot())
        .unwrap_or(ShiftSnapshot {
            shift_id: entry.shift_id,
            employee_id: entry.employee_id,
            day: entry.day,
            start_min: 0,
            end_min: 0,
        })
}

fn fmt_hm(m: Minutes) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Adjacent-pair overlap within each (employee, day) group sorted by start.
fn check_overlaps(
    schedule_id: Ulid,
    timeline: &ShiftTimeline,
    by_id: &HashMap<Ulid, &ShiftAssignment>,
    now: Ms,
    ids: &dyn IdSource,
    out: &mut Vec<Conflict>,
) {
    for ((employee_id, day), group) in timeline.employee_day_groups() {
        for pair in group.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            if current.span.end > next.span.start {
                let a = snapshot_of(by_id, current);
                let b = snapshot_of(by_id, next);
                out.push(new_conflict(
                    schedule_id,
                    ConflictKind::Overlap,
                    Severity::Critical,
                    "Overlapping shifts".into(),
                    format!(
                        "employee {employee_id} is double-booked on day {day}: \
                         [{}, {}) overlaps [{}, {})",
                        fmt_hm(a.start_min),
                        fmt_hm(a.end_min),
                        fmt_hm(b.start_min),
                        fmt_hm(b.end_min),
                    ),
                    vec![*employee_id],
                    vec![a, b],
                    vec![*day],
                    Some(SuggestionHint {
                        kind: ResolutionKind::AdjustTimes,
                        note: "trim one shift so the two no longer overlap".into(),
                    }),
                    now,
                    ids,
                ));
            }
        }
    }
}

/// Days staffed below the configured minimum of distinct employees.
fn check_coverage(
    schedule_id: Ulid,
    timeline: &ShiftTimeline,
    by_id: &HashMap<Ulid, &ShiftAssignment>,
    min_daily_coverage: usize,
    now: Ms,
    ids: &dyn IdSource,
    out: &mut Vec<Conflict>,
) {
    for (day, entries) in timeline.day_groups() {
        let staffed = timeline.employees_on(*day);
        if staffed.len() >= min_daily_coverage {
            continue;
        }
        let shortfall = min_daily_coverage - staffed.len();
        out.push(new_conflict(
            schedule_id,
            ConflictKind::Coverage,
            Severity::Major,
            "Insufficient coverage".into(),
            format!(
                "day {day} has {} scheduled employee(s), {shortfall} below the minimum of {min_daily_coverage}",
                staffed.len(),
            ),
            staffed,
            entries.iter().map(|e| snapshot_of(by_id, e)).collect(),
            vec![*day],
            Some(SuggestionHint {
                kind: ResolutionKind::AddCoverage,
                note: format!("add {shortfall} shift(s) on day {day}"),
            }),
            now,
            ids,
        ));
    }
}

/// One conflict per maximal consecutive-day run exceeding the rule's max.
#[allow(clippy::too_many_arguments)]
fn check_rules(
    schedule_id: Ulid,
    timeline: &ShiftTimeline,
    by_id: &HashMap<Ulid, &ShiftAssignment>,
    employees: &HashMap<Ulid, &Employee>,
    rules: &[Rule],
    now: Ms,
    ids: &dyn IdSource,
    out: &mut Vec<Conflict>,
    diagnostics: &mut Vec<DetectionDiagnostic>,
) {
    let day_range = schedule_day_range(timeline);

    for rule in rules {
        if let Some((from, to)) = day_range
            && !rule.effective_over(from, to)
        {
            continue;
        }
        match &rule.kind {
            RuleKind::MaxConsecutiveDays { max_days } => {
                if *max_days == 0 {
                    diagnostics.push(DetectionDiagnostic {
                        source: rule.id,
                        message: "max_consecutive_days rule has max_days = 0".into(),
                    });
                    continue;
                }
                for employee_id in timeline.employees() {
                    let in_scope = match employees.get(employee_id) {
                        Some(e) => rule.scope.applies_to(e),
                        None => matches!(rule.scope, RuleScope::All),
                    };
                    if !in_scope {
                        continue;
                    }
                    for run in consecutive_runs(&timeline.worked_days(employee_id)) {
                        if run.len() <= *max_days as usize {
                            continue;
                        }
                        let shifts: Vec<ShiftSnapshot> = run
                            .iter()
                            .flat_map(|day| {
                                timeline
                                    .entries_for(employee_id)
                                    .iter()
                                    .filter(|e| e.day == *day)
                                    .map(|e| snapshot_of(by_id, e))
                                    .collect::<Vec<_>>()
                            })
                            .collect();
                        out.push(new_conflict(
                            schedule_id,
                            ConflictKind::Rule,
                            Severity::Major,
                            "Too many consecutive days".into(),
                            format!(
                                "employee {employee_id} works {} consecutive days \
                                 (days {}..={}), exceeding the maximum of {max_days}",
                                run.len(),
                                run[0],
                                run[run.len() - 1],
                            ),
                            vec![*employee_id],
                            shifts,
                            run,
                            Some(SuggestionHint {
                                kind: ResolutionKind::AddRestDay,
                                note: "insert a rest day to break the run".into(),
                            }),
                            now,
                            ids,
                        ));
                    }
                }
            }
        }
    }
}

/// Split sorted distinct days into maximal consecutive runs.
fn consecutive_runs(days: &[Day]) -> Vec<Vec<Day>> {
    let mut runs: Vec<Vec<Day>> = Vec::new();
    for &day in days {
        match runs.last_mut() {
            Some(run) if day - run[run.len() - 1] == 1 => run.push(day),
            _ => runs.push(vec![day]),
        }
    }
    runs
}

fn schedule_day_range(timeline: &ShiftTimeline) -> Option<(Day, Day)> {
    let mut range: Option<(Day, Day)> = None;
    for (day, _) in timeline.day_groups() {
        range = Some(match range {
            Some((from, to)) => (from.min(*day), to.max(*day)),
            None => (*day, *day),
        });
    }
    range
}

/// A shift is non-compliant with a constraint if its day falls outside the
/// validity window, its weekday is missing from a configured days_of_week
/// set, or its time range overlaps none of the configured time_ranges.
/// A constraint with no time_ranges is satisfied by day match alone.
fn check_constraints(
    schedule_id: Ulid,
    shifts: &[ShiftAssignment],
    constraints: &[Constraint],
    now: Ms,
    ids: &dyn IdSource,
    out: &mut Vec<Conflict>,
    diagnostics: &mut Vec<DetectionDiagnostic>,
) {
    for constraint in constraints {
        if constraint.valid_from > constraint.valid_to {
            diagnostics.push(DetectionDiagnostic {
                source: constraint.id,
                message: format!(
                    "validity window is inverted: [{}, {}]",
                    constraint.valid_from, constraint.valid_to
                ),
            });
            continue;
        }
        if let Some(days) = &constraint.days_of_week
            && days.iter().any(|d| *d > 6)
        {
            diagnostics.push(DetectionDiagnostic {
                source: constraint.id,
                message: "days_of_week contains a value outside 0..=6".into(),
            });
            continue;
        }
        if let Some(ranges) = &constraint.time_ranges
            && ranges
                .iter()
                .any(|(a, b)| !valid_minute_of_day(*a) || !valid_minute_of_day(*b) || a == b)
        {
            diagnostics.push(DetectionDiagnostic {
                source: constraint.id,
                message: "time_ranges contains an invalid range".into(),
            });
            continue;
        }

        for shift in shifts {
            if shift.employee_id != constraint.employee_id
                || shift.status == ShiftStatus::Cancelled
            {
                continue;
            }
            if constraint_allows(constraint, shift) {
                continue;
            }
            let severity = if constraint.is_hard {
                Severity::Major
            } else {
                Severity::Minor
            };
            let hint = if constraint.is_hard {
                SuggestionHint {
                    kind: ResolutionKind::ReassignEmployee,
                    note: "hard constraint; move the shift to someone else".into(),
                }
            } else {
                SuggestionHint {
                    kind: ResolutionKind::OverrideConstraint,
                    note: "soft constraint; may be overridden with a reason".into(),
                }
            };
            out.push(new_conflict(
                schedule_id,
                ConflictKind::Constraint,
                severity,
                "Constraint violation".into(),
                format!(
                    "shift on day {} at [{}, {}) violates {} {} constraint for employee {}",
                    shift.day,
                    fmt_hm(shift.effective_start_min()),
                    fmt_hm(shift.effective_end_min()),
                    if constraint.is_hard { "hard" } else { "soft" },
                    match constraint.kind {
                        ConstraintKind::Availability => "availability",
                        ConstraintKind::Preference => "preference",
                        ConstraintKind::Restriction => "restriction",
                    },
                    shift.employee_id,
                ),
                vec![shift.employee_id],
                vec![shift.snapshot()],
                vec![shift.day],
                Some(hint),
                now,
                ids,
            ));
        }
    }
}

fn constraint_allows(constraint: &Constraint, shift: &ShiftAssignment) -> bool {
    if shift.day < constraint.valid_from || shift.day > constraint.valid_to {
        return false;
    }
    if let Some(days) = &constraint.days_of_week
        && !days.contains(&weekday(shift.day))
    {
        return false;
    }
    if let Some(ranges) = &constraint.time_ranges {
        let start = shift.effective_start_min();
        let dur = wrapped_duration(start, shift.effective_end_min());
        let end = start + dur.max(1);
        return ranges.iter().any(|(a, b)| {
            // Same-day part [start, min(end, 1440)) plus next-day spill
            // [0, end - 1440) for overnight shifts.
            (start < *b && *a < end) || (end > MINUTES_PER_DAY && *a < end - MINUTES_PER_DAY)
        });
    }
    true
}
