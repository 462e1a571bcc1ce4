use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — wall-clock instants (detected_at, resolved_at).
pub type Ms = i64;

/// Days since the Unix epoch — the only calendar type.
pub type Day = i64;

/// Minutes — minute-of-day values in `[0, 1440)` and absolute minutes
/// (`day * MINUTES_PER_DAY + minute_of_day`).
pub type Minutes = i64;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

/// Weekday for an epoch day, 0 = Monday .. 6 = Sunday.
pub fn weekday(day: Day) -> u8 {
    // Day 0 (1970-01-01) was a Thursday.
    ((day + 3).rem_euclid(7)) as u8
}

/// Half-open interval `[start, end)` over absolute minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Minutes,
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Minutes) -> bool {
        self.start <= t && t < self.end
    }
}

/// Normalized duration of a `[start_min, end_min)` time-of-day pair.
/// `end < start` wraps to the next day; `end == start` is zero (invalid).
pub fn wrapped_duration(start_min: Minutes, end_min: Minutes) -> Minutes {
    if end_min > start_min {
        end_min - start_min
    } else if end_min < start_min {
        end_min + MINUTES_PER_DAY - start_min
    } else {
        0
    }
}

/// True for a minute-of-day value that can appear in a shift.
pub fn valid_minute_of_day(m: Minutes) -> bool {
    (0..MINUTES_PER_DAY).contains(&m)
}

// ── Shift assignments ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftStatus {
    Assigned,
    Confirmed,
    Swapped,
    Cancelled,
}

/// One employee working one time range on one day of a schedule.
/// Override times, when present, win over the base times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub id: Ulid,
    pub schedule_id: Ulid,
    pub employee_id: Ulid,
    pub day: Day,
    pub start_min: Minutes,
    pub end_min: Minutes,
    pub override_start_min: Option<Minutes>,
    pub override_end_min: Option<Minutes>,
    pub status: ShiftStatus,
    pub notes: Option<String>,
}

impl ShiftAssignment {
    pub fn effective_start_min(&self) -> Minutes {
        self.override_start_min.unwrap_or(self.start_min)
    }

    pub fn effective_end_min(&self) -> Minutes {
        self.override_end_min.unwrap_or(self.end_min)
    }

    /// Absolute-minute span with overnight wraparound normalized:
    /// an effective end before the start ends on the next day.
    pub fn effective_span(&self) -> Span {
        let start = self.day * MINUTES_PER_DAY + self.effective_start_min();
        let mut dur = wrapped_duration(self.effective_start_min(), self.effective_end_min());
        if dur == 0 {
            // Invalid stored data; keep a 1-minute sliver rather than panic.
            dur = 1;
        }
        Span::new(start, start + dur)
    }

    pub fn snapshot(&self) -> ShiftSnapshot {
        ShiftSnapshot {
            shift_id: self.id,
            employee_id: self.employee_id,
            day: self.day,
            start_min: self.effective_start_min(),
            end_min: self.effective_end_min(),
        }
    }
}

/// Immutable copy of a shift embedded in conflicts and removal results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSnapshot {
    pub shift_id: Ulid,
    pub employee_id: Ulid,
    pub day: Day,
    pub start_min: Minutes,
    pub end_min: Minutes,
}

// ── Employees (read-only collaborator records) ───────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Ulid,
    pub name: String,
    pub department: Option<String>,
    pub role: Option<String>,
    pub active: bool,
}

// ── Conflicts ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    Overlap,
    Coverage,
    Rule,
    Constraint,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Overlap => "overlap",
            ConflictKind::Coverage => "coverage",
            ConflictKind::Rule => "rule",
            ConflictKind::Constraint => "constraint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictStatus {
    Open,
    Acknowledged,
    Resolved,
    Ignored,
}

impl ConflictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStatus::Open => "open",
            ConflictStatus::Acknowledged => "acknowledged",
            ConflictStatus::Resolved => "resolved",
            ConflictStatus::Ignored => "ignored",
        }
    }
}

/// The eight remediation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionKind {
    AdjustTimes,
    ReassignEmployee,
    SplitShift,
    AddCoverage,
    RemoveShift,
    OverrideConstraint,
    AddRestDay,
    Custom,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::AdjustTimes => "adjust_times",
            ResolutionKind::ReassignEmployee => "reassign_employee",
            ResolutionKind::SplitShift => "split_shift",
            ResolutionKind::AddCoverage => "add_coverage",
            ResolutionKind::RemoveShift => "remove_shift",
            ResolutionKind::OverrideConstraint => "override_constraint",
            ResolutionKind::AddRestDay => "add_rest_day",
            ResolutionKind::Custom => "custom",
        }
    }
}

/// Structured hint stamped by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionHint {
    pub kind: ResolutionKind,
    pub note: String,
}

/// A detected scheduling inconsistency. Kind and severity are fixed at
/// detection time; only status and the resolution fields mutate afterwards.
/// Conflict records are never physically deleted by this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: Ulid,
    pub schedule_id: Ulid,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub employee_ids: Vec<Ulid>,
    pub shifts: Vec<ShiftSnapshot>,
    pub days: Vec<Day>,
    pub status: ConflictStatus,
    pub suggested_resolution: Option<SuggestionHint>,
    pub resolution_notes: Option<String>,
    pub detected_at: Ms,
    pub resolved_at: Option<Ms>,
    pub resolved_by: Option<String>,
}

// ── Rules (read-only, authored elsewhere) ────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// No more than `max_days` consecutive worked calendar days.
    /// `max_days == 0` is malformed and reported as a diagnostic.
    MaxConsecutiveDays { max_days: u32 },
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::MaxConsecutiveDays { .. } => "max_consecutive_days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleScope {
    All,
    Department(String),
    Role(String),
    Employees(Vec<Ulid>),
}

impl RuleScope {
    pub fn applies_to(&self, employee: &Employee) -> bool {
        match self {
            RuleScope::All => true,
            RuleScope::Department(d) => employee.department.as_deref() == Some(d.as_str()),
            RuleScope::Role(r) => employee.role.as_deref() == Some(r.as_str()),
            RuleScope::Employees(ids) => ids.contains(&employee.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Ulid,
    pub org_id: Ulid,
    pub kind: RuleKind,
    pub scope: RuleScope,
    pub violation_penalty: u32,
    pub priority: u32,
    pub active: bool,
    pub effective_from: Option<Day>,
    pub effective_to: Option<Day>,
}

impl Rule {
    /// True when the rule's effective window intersects `[from, to]`.
    pub fn effective_over(&self, from: Day, to: Day) -> bool {
        self.effective_from.is_none_or(|f| f <= to) && self.effective_to.is_none_or(|t| t >= from)
    }
}

// ── Constraints (read-only except override annotations) ─────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    Availability,
    Preference,
    Restriction,
}

/// An employee scheduling constraint. Hard constraints are never mutated
/// by override_constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: Ulid,
    pub employee_id: Ulid,
    pub kind: ConstraintKind,
    pub is_hard: bool,
    pub valid_from: Day,
    pub valid_to: Day,
    pub days_of_week: Option<Vec<u8>>,
    pub time_ranges: Option<Vec<(Minutes, Minutes)>>,
    pub active: bool,
    pub description: String,
}

// ── Change events ────────────────────────────────────────────────

/// The mutation record — flat, no nesting. A resolution's changes are a
/// slice of these, committed all-or-nothing by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    ShiftTimesAdjusted {
        shift_id: Ulid,
        new_start_min: Option<Minutes>,
        new_end_min: Option<Minutes>,
        reason: String,
    },
    ShiftReassigned {
        shift_id: Ulid,
        new_employee_id: Ulid,
    },
    ShiftTruncated {
        shift_id: Ulid,
        new_end_min: Minutes,
    },
    ShiftCreated {
        shift: ShiftAssignment,
    },
    ShiftRemoved {
        shift_id: Ulid,
    },
    ConstraintAnnotated {
        constraint_id: Ulid,
        note: String,
    },
    ConflictStatusChanged {
        conflict_id: Ulid,
        status: ConflictStatus,
        resolution_notes: Option<String>,
        resolved_at: Option<Ms>,
        resolved_by: Option<String>,
    },
}

// ── Detection result types ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DetectionSummary {
    pub conflicts_found: usize,
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
    pub warnings: usize,
    pub detection_time_ms: Ms,
}

/// A non-fatal per-rule / per-constraint evaluation failure. Detection
/// reports these alongside conflicts instead of silently under-reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionDiagnostic {
    pub source: Ulid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOutcome {
    pub summary: DetectionSummary,
    pub conflicts: Vec<Conflict>,
    pub diagnostics: Vec<DetectionDiagnostic>,
}
