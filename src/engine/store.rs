use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Persistence collaborator. The engine issues only these operations; the
/// storage schema behind them is someone else's problem. `commit` is the
/// transactional boundary: the whole slice of changes lands or none of it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn shift(&self, id: Ulid) -> Result<Option<ShiftAssignment>, StoreError>;
    async fn shifts_for_schedule(&self, schedule_id: Ulid)
    -> Result<Vec<ShiftAssignment>, StoreError>;

    async fn employee(&self, id: Ulid) -> Result<Option<Employee>, StoreError>;
    async fn employees(&self, ids: &[Ulid]) -> Result<Vec<Employee>, StoreError>;

    async fn active_rules(&self, org_id: Ulid) -> Result<Vec<Rule>, StoreError>;

    async fn constraint(&self, id: Ulid) -> Result<Option<Constraint>, StoreError>;
    async fn active_constraints_for(&self, employee_ids: &[Ulid])
    -> Result<Vec<Constraint>, StoreError>;

    async fn conflict(&self, id: Ulid) -> Result<Option<Conflict>, StoreError>;
    async fn conflicts_for_schedule(&self, schedule_id: Ulid) -> Result<Vec<Conflict>, StoreError>;
    async fn insert_conflicts(&self, conflicts: &[Conflict]) -> Result<(), StoreError>;

    async fn commit(&self, changes: &[ChangeEvent]) -> Result<(), StoreError>;
}

/// In-memory store: DashMap per entity plus schedule indexes. Commits are
/// serialized through one lock and validated in full before any event is
/// applied, so a failed commit leaves every map untouched.
pub struct InMemoryStore {
    shifts: DashMap<Ulid, ShiftAssignment>,
    employees: DashMap<Ulid, Employee>,
    rules: DashMap<Ulid, Rule>,
    constraints: DashMap<Ulid, Constraint>,
    conflicts: DashMap<Ulid, Conflict>,
    /// Schedule → shift ids.
    schedule_shifts: DashMap<Ulid, Vec<Ulid>>,
    /// Schedule → conflict ids.
    schedule_conflicts: DashMap<Ulid, Vec<Ulid>>,
    commit_lock: Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            shifts: DashMap::new(),
            employees: DashMap::new(),
            rules: DashMap::new(),
            constraints: DashMap::new(),
            conflicts: DashMap::new(),
            schedule_shifts: DashMap::new(),
            schedule_conflicts: DashMap::new(),
            commit_lock: Mutex::new(()),
        }
    }

    // ── Seeding (schedule generation / manual edits live outside the core) ──

    pub fn seed_shift(&self, shift: ShiftAssignment) {
        self.schedule_shifts
            .entry(shift.schedule_id)
            .or_default()
            .push(shift.id);
        self.shifts.insert(shift.id, shift);
    }

    pub fn seed_employee(&self, employee: Employee) {
        self.employees.insert(employee.id, employee);
    }

    pub fn seed_rule(&self, rule: Rule) {
        self.rules.insert(rule.id, rule);
    }

    pub fn seed_constraint(&self, constraint: Constraint) {
        self.constraints.insert(constraint.id, constraint);
    }

    pub fn shift_count(&self) -> usize {
        self.shifts.len()
    }

    fn unindex_shift(&self, shift_id: &Ulid, schedule_id: &Ulid) {
        if let Some(mut ids) = self.schedule_shifts.get_mut(schedule_id) {
            ids.retain(|s| s != shift_id);
        }
    }

    /// Validate one event against current state. Phase 1 of commit.
    fn validate_event(&self, event: &ChangeEvent) -> Result<(), StoreError> {
        match event {
            ChangeEvent::ShiftTimesAdjusted { shift_id, .. }
            | ChangeEvent::ShiftReassigned { shift_id, .. }
            | ChangeEvent::ShiftTruncated { shift_id, .. }
            | ChangeEvent::ShiftRemoved { shift_id } => {
                if !self.shifts.contains_key(shift_id) {
                    return Err(StoreError(format!("shift {shift_id} missing")));
                }
            }
            ChangeEvent::ShiftCreated { shift } => {
                if self.shifts.contains_key(&shift.id) {
                    return Err(StoreError(format!("shift {} already exists", shift.id)));
                }
            }
            ChangeEvent::ConstraintAnnotated { constraint_id, .. } => {
                if !self.constraints.contains_key(constraint_id) {
                    return Err(StoreError(format!("constraint {constraint_id} missing")));
                }
            }
            ChangeEvent::ConflictStatusChanged { conflict_id, .. } => {
                if !self.conflicts.contains_key(conflict_id) {
                    return Err(StoreError(format!("conflict {conflict_id} missing")));
                }
            }
        }
        Ok(())
    }

    /// Apply one validated event. Phase 2 of commit.
    fn apply_event(&self, event: &ChangeEvent) {
        match event {
            ChangeEvent::ShiftTimesAdjusted {
                shift_id,
                new_start_min,
                new_end_min,
                reason,
            } => {
                if let Some(mut shift) = self.shifts.get_mut(shift_id) {
                    if new_start_min.is_some() {
                        shift.override_start_min = *new_start_min;
                    }
                    if new_end_min.is_some() {
                        shift.override_end_min = *new_end_min;
                    }
                    shift.notes = Some(match shift.notes.take() {
                        Some(existing) => format!("{existing}\n{reason}"),
                        None => reason.clone(),
                    });
                }
            }
            ChangeEvent::ShiftReassigned {
                shift_id,
                new_employee_id,
            } => {
                if let Some(mut shift) = self.shifts.get_mut(shift_id) {
                    shift.employee_id = *new_employee_id;
                }
            }
            ChangeEvent::ShiftTruncated {
                shift_id,
                new_end_min,
            } => {
                if let Some(mut shift) = self.shifts.get_mut(shift_id) {
                    shift.override_end_min = Some(*new_end_min);
                }
            }
            ChangeEvent::ShiftCreated { shift } => {
                self.seed_shift(shift.clone());
            }
            ChangeEvent::ShiftRemoved { shift_id } => {
                if let Some((_, shift)) = self.shifts.remove(shift_id) {
                    self.unindex_shift(shift_id, &shift.schedule_id);
                }
            }
            ChangeEvent::ConstraintAnnotated {
                constraint_id,
                note,
            } => {
                if let Some(mut constraint) = self.constraints.get_mut(constraint_id) {
                    constraint.description.push('\n');
                    constraint.description.push_str(note);
                }
            }
            ChangeEvent::ConflictStatusChanged {
                conflict_id,
                status,
                resolution_notes,
                resolved_at,
                resolved_by,
            } => {
                if let Some(mut conflict) = self.conflicts.get_mut(conflict_id) {
                    conflict.status = *status;
                    if resolution_notes.is_some() {
                        conflict.resolution_notes = resolution_notes.clone();
                    }
                    if resolved_at.is_some() {
                        conflict.resolved_at = *resolved_at;
                    }
                    if resolved_by.is_some() {
                        conflict.resolved_by = resolved_by.clone();
                    }
                }
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn shift(&self, id: Ulid) -> Result<Option<ShiftAssignment>, StoreError> {
        Ok(self.shifts.get(&id).map(|e| e.value().clone()))
    }

    async fn shifts_for_schedule(
        &self,
        schedule_id: Ulid,
    ) -> Result<Vec<ShiftAssignment>, StoreError> {
        let ids = self
            .schedule_shifts
            .get(&schedule_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.shifts.get(id).map(|e| e.value().clone()))
            .collect())
    }

    async fn employee(&self, id: Ulid) -> Result<Option<Employee>, StoreError> {
        Ok(self.employees.get(&id).map(|e| e.value().clone()))
    }

    async fn employees(&self, ids: &[Ulid]) -> Result<Vec<Employee>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.employees.get(id).map(|e| e.value().clone()))
            .collect())
    }

    async fn active_rules(&self, org_id: Ulid) -> Result<Vec<Rule>, StoreError> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|e| e.value().org_id == org_id && e.value().active)
            .map(|e| e.value().clone())
            .collect();
        rules.sort_by_key(|r| (std::cmp::Reverse(r.priority), r.id));
        Ok(rules)
    }

    async fn constraint(&self, id: Ulid) -> Result<Option<Constraint>, StoreError> {
        Ok(self.constraints.get(&id).map(|e| e.value().clone()))
    }

    async fn active_constraints_for(
        &self,
        employee_ids: &[Ulid],
    ) -> Result<Vec<Constraint>, StoreError> {
        let mut constraints: Vec<Constraint> = self
            .constraints
            .iter()
            .filter(|e| e.value().active && employee_ids.contains(&e.value().employee_id))
            .map(|e| e.value().clone())
            .collect();
        constraints.sort_by_key(|c| c.id);
        Ok(constraints)
    }

    async fn conflict(&self, id: Ulid) -> Result<Option<Conflict>, StoreError> {
        Ok(self.conflicts.get(&id).map(|e| e.value().clone()))
    }

    async fn conflicts_for_schedule(&self, schedule_id: Ulid) -> Result<Vec<Conflict>, StoreError> {
        let ids = self
            .schedule_conflicts
            .get(&schedule_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.conflicts.get(id).map(|e| e.value().clone()))
            .collect())
    }

    async fn insert_conflicts(&self, conflicts: &[Conflict]) -> Result<(), StoreError> {
        for conflict in conflicts {
            self.schedule_conflicts
                .entry(conflict.schedule_id)
                .or_default()
                .push(conflict.id);
            self.conflicts.insert(conflict.id, conflict.clone());
        }
        Ok(())
    }

    async fn commit(&self, changes: &[ChangeEvent]) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().await;
        for event in changes {
            self.validate_event(event)?;
        }
        for event in changes {
            self.apply_event(event);
        }
        Ok(())
    }
}
