//! Ordered per-employee, per-day view over a schedule's shift assignments.
//! Pure data structure: built once per detection or validation pass,
//! queried read-only. Cancelled shifts are not worked time and are
//! excluded at construction.

use std::collections::BTreeMap;

use ulid::Ulid;

use crate::model::{Day, ShiftAssignment, ShiftStatus, Span};

/// One shift projected onto the timeline: normalized absolute-minute span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub shift_id: Ulid,
    pub employee_id: Ulid,
    pub day: Day,
    pub span: Span,
}

pub struct ShiftTimeline {
    /// All entries per employee, sorted by span start.
    by_employee: BTreeMap<Ulid, Vec<TimelineEntry>>,
    /// Entries grouped by (employee, assignment day), sorted by span start.
    by_employee_day: BTreeMap<(Ulid, Day), Vec<TimelineEntry>>,
    /// Entries grouped by assignment day.
    by_day: BTreeMap<Day, Vec<TimelineEntry>>,
}

impl ShiftTimeline {
    pub fn build(shifts: &[ShiftAssignment]) -> Self {
        let mut by_employee: BTreeMap<Ulid, Vec<TimelineEntry>> = BTreeMap::new();
        let mut by_employee_day: BTreeMap<(Ulid, Day), Vec<TimelineEntry>> = BTreeMap::new();
        let mut by_day: BTreeMap<Day, Vec<TimelineEntry>> = BTreeMap::new();

        for shift in shifts {
            if shift.status == ShiftStatus::Cancelled {
                continue;
            }
            let entry = TimelineEntry {
                shift_id: shift.id,
                employee_id: shift.employee_id,
                day: shift.day,
                span: shift.effective_span(),
            };
            insert_sorted(by_employee.entry(shift.employee_id).or_default(), entry);
            insert_sorted(
                by_employee_day
                    .entry((shift.employee_id, shift.day))
                    .or_default(),
                entry,
            );
            insert_sorted(by_day.entry(shift.day).or_default(), entry);
        }

        Self {
            by_employee,
            by_employee_day,
            by_day,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_employee.is_empty()
    }

    /// (employee, day) groups in deterministic order, each sorted by start.
    pub fn employee_day_groups(&self) -> impl Iterator<Item = (&(Ulid, Day), &Vec<TimelineEntry>)> {
        self.by_employee_day.iter()
    }

    /// Day groups in ascending day order.
    pub fn day_groups(&self) -> impl Iterator<Item = (&Day, &Vec<TimelineEntry>)> {
        self.by_day.iter()
    }

    pub fn employees(&self) -> impl Iterator<Item = &Ulid> {
        self.by_employee.keys()
    }

    pub fn entries_for(&self, employee_id: &Ulid) -> &[TimelineEntry] {
        self.by_employee
            .get(employee_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct employees scheduled on a day.
    pub fn employees_on(&self, day: Day) -> Vec<Ulid> {
        let mut ids: Vec<Ulid> = self
            .by_day
            .get(&day)
            .map(|entries| entries.iter().map(|e| e.employee_id).collect())
            .unwrap_or_default();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Distinct assignment days worked by an employee, ascending.
    pub fn worked_days(&self, employee_id: &Ulid) -> Vec<Day> {
        let mut days: Vec<Day> = self
            .by_employee_day
            .range((*employee_id, Day::MIN)..=(*employee_id, Day::MAX))
            .map(|((_, day), _)| *day)
            .collect();
        days.dedup();
        days
    }

    /// First of the employee's entries overlapping `span`, skipping
    /// `exclude`. Binary search skips entries starting at or after span.end.
    pub fn first_overlap(
        &self,
        employee_id: &Ulid,
        span: &Span,
        exclude: Option<Ulid>,
    ) -> Option<&TimelineEntry> {
        let entries = self.entries_for(employee_id);
        let right_bound = entries.partition_point(|e| e.span.start < span.end);
        entries[..right_bound]
            .iter()
            .filter(|e| Some(e.shift_id) != exclude)
            .find(|e| e.span.end > span.start)
    }
}

/// Insert maintaining sort order by span start.
fn insert_sorted(entries: &mut Vec<TimelineEntry>, entry: TimelineEntry) {
    let pos = entries
        .binary_search_by_key(&entry.span.start, |e| e.span.start)
        .unwrap_or_else(|e| e);
    entries.insert(pos, entry);
}
