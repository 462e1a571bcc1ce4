use std::sync::Arc;

use ulid::Ulid;

use rostra::clock::{ManualClock, SeqIds};
use rostra::engine::{
    Engine, EngineConfig, InMemoryStore, NewShiftSpec, ResolutionPayload, ResolutionRequest, Store,
};
use rostra::model::*;
use rostra::notify::{self, NotifyHub};

const DAY: Day = 20_000;

// ── Test infrastructure ──────────────────────────────────────

struct Harness {
    engine: Engine,
    store: Arc<InMemoryStore>,
    schedule_id: Ulid,
    org_id: Ulid,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let engine = Engine::new(
        store.clone(),
        Arc::new(NotifyHub::new()),
        Arc::new(ManualClock::new(1_700_000_000_000)),
        Arc::new(SeqIds::new()),
        EngineConfig::default(),
    );
    Harness {
        engine,
        store,
        schedule_id: Ulid::new(),
        org_id: Ulid::new(),
    }
}

impl Harness {
    fn employee(&self, name: &str) -> Ulid {
        let id = Ulid::new();
        self.store.seed_employee(Employee {
            id,
            name: name.into(),
            department: None,
            role: None,
            active: true,
        });
        id
    }

    fn shift(&self, employee_id: Ulid, day: Day, start_h: Minutes, end_h: Minutes) -> Ulid {
        let id = Ulid::new();
        self.store.seed_shift(ShiftAssignment {
            id,
            schedule_id: self.schedule_id,
            employee_id,
            day,
            start_min: start_h * 60,
            end_min: end_h * 60,
            override_start_min: None,
            override_end_min: None,
            status: ShiftStatus::Assigned,
            notes: None,
        });
        id
    }
}

fn apply(payload: ResolutionPayload) -> ResolutionRequest {
    ResolutionRequest {
        payload,
        apply_immediately: true,
        actor: Some("admin".into()),
    }
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn detect_resolve_redetect_through_public_api() {
    let h = harness();
    let alice = h.employee("alice");
    let bob = h.employee("bob");
    let early = h.shift(alice, DAY, 9, 17);
    h.shift(alice, DAY, 16, 20);
    h.shift(bob, DAY, 8, 16);

    let mut rx = h.engine.notify.subscribe(h.schedule_id);

    let outcome = h
        .engine
        .detect_conflicts(h.schedule_id, h.org_id)
        .await
        .unwrap();
    assert_eq!(outcome.summary.conflicts_found, 1);
    assert_eq!(outcome.summary.critical, 1);
    let conflict = &outcome.conflicts[0];
    assert_eq!(conflict.kind, ConflictKind::Overlap);

    let detected = rx.try_recv().unwrap();
    assert_eq!(detected.name, notify::CONFLICT_DETECTED);

    let suggestions = h.engine.suggest(conflict.id).await.unwrap();
    assert_eq!(suggestions[0].kind, ResolutionKind::AdjustTimes);

    let result = h
        .engine
        .resolve(
            conflict.id,
            apply(ResolutionPayload::AdjustTimes {
                adjustments: vec![rostra::engine::ShiftAdjustment {
                    shift_id: early,
                    new_start_min: None,
                    new_end_min: Some(16 * 60),
                }],
            }),
        )
        .await;
    assert!(result.success);
    let resolved = rx.try_recv().unwrap();
    assert_eq!(resolved.name, notify::CONFLICT_RESOLVED);

    let adjusted = h.store.shift(early).await.unwrap().unwrap();
    assert_eq!(adjusted.override_end_min, Some(16 * 60));

    let clean = h
        .engine
        .detect_conflicts(h.schedule_id, h.org_id)
        .await
        .unwrap();
    assert_eq!(clean.summary.conflicts_found, 0);
}

#[tokio::test]
async fn coverage_gap_filled_with_add_coverage() {
    let h = harness();
    let alice = h.employee("alice");
    let bob = h.employee("bob");
    h.shift(alice, DAY, 9, 17);

    let outcome = h
        .engine
        .detect_conflicts(h.schedule_id, h.org_id)
        .await
        .unwrap();
    assert_eq!(outcome.summary.major, 1);
    let gap = &outcome.conflicts[0];
    assert_eq!(gap.kind, ConflictKind::Coverage);

    let result = h
        .engine
        .resolve(
            gap.id,
            apply(ResolutionPayload::AddCoverage {
                shifts: vec![NewShiftSpec {
                    employee_id: bob,
                    day: DAY,
                    start_min: 12 * 60,
                    end_min: 20 * 60,
                    notes: None,
                }],
            }),
        )
        .await;
    assert!(result.success);

    let clean = h
        .engine
        .detect_conflicts(h.schedule_id, h.org_id)
        .await
        .unwrap();
    assert_eq!(clean.summary.conflicts_found, 0);
}

#[tokio::test]
async fn batch_resolution_summary_over_mixed_ids() {
    let h = harness();
    let alice = h.employee("alice");
    let bob = h.employee("bob");
    for d in 0..2 {
        h.shift(alice, DAY + d, 9, 17);
        h.shift(alice, DAY + d, 16, 20);
        h.shift(bob, DAY + d, 8, 16); // keeps coverage satisfied
    }

    let outcome = h
        .engine
        .detect_conflicts(h.schedule_id, h.org_id)
        .await
        .unwrap();
    let mut ids: Vec<Ulid> = outcome.conflicts.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 2);
    ids.push(Ulid::new()); // bogus id fails independently

    let summary = h
        .engine
        .batch_resolve(
            &ids,
            ResolutionPayload::RemoveShift {
                shift_id: Ulid::new(),
            },
            "admin",
        )
        .await
        .unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results.len(), 3);

    let clean = h
        .engine
        .detect_conflicts(h.schedule_id, h.org_id)
        .await
        .unwrap();
    assert!(
        clean
            .conflicts
            .iter()
            .all(|c| c.kind != ConflictKind::Overlap)
    );
}
