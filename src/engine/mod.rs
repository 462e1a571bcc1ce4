mod batch;
mod detect;
mod error;
mod impact;
mod registry;
mod resolve;
mod store;
mod suggest;

pub use batch::{BatchItemResult, BatchSummary};
pub use detect::{DetectionInput, run_detection};
pub use error::{EngineError, EntityKind};
pub use impact::ImpactEstimate;
pub use resolve::{
    NewShiftSpec, ResolutionFailure, ResolutionPayload, ResolutionRequest, ResolutionResult,
    ShiftAdjustment,
};
pub use store::{InMemoryStore, Store, StoreError};
pub use suggest::Suggestion;

use std::sync::Arc;

use ulid::Ulid;

use crate::clock::{Clock, IdSource};
use crate::limits;
use crate::model::*;
use crate::notify::NotifyHub;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum distinct employees per day before a coverage conflict fires.
    pub min_daily_coverage: usize,
    /// Ceiling on conflict ids per batch_resolve call.
    pub max_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_daily_coverage: 2,
            max_batch_size: limits::MAX_BATCH_SIZE,
        }
    }
}

impl EngineConfig {
    /// Read overrides from `ROSTRA_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_daily_coverage: std::env::var("ROSTRA_MIN_COVERAGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_daily_coverage),
            max_batch_size: std::env::var("ROSTRA_MAX_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0 && n <= limits::MAX_BATCH_SIZE)
                .unwrap_or(defaults.max_batch_size),
        }
    }
}

pub struct Engine {
    pub(super) store: Arc<dyn Store>,
    pub notify: Arc<NotifyHub>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdSource>,
    pub(super) config: EngineConfig,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        notify: Arc<NotifyHub>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            notify,
            clock,
            ids,
            config,
        }
    }

    pub async fn get_conflict(&self, id: Ulid) -> Result<Option<Conflict>, EngineError> {
        self.store.conflict(id).await.map_err(persistence)
    }

    pub async fn conflicts_for_schedule(
        &self,
        schedule_id: Ulid,
    ) -> Result<Vec<Conflict>, EngineError> {
        self.store
            .conflicts_for_schedule(schedule_id)
            .await
            .map_err(persistence)
    }

    pub(super) async fn require_conflict(&self, id: Ulid) -> Result<Conflict, EngineError> {
        self.store
            .conflict(id)
            .await
            .map_err(persistence)?
            .ok_or(EngineError::NotFound(EntityKind::Conflict, id))
    }

    pub(super) async fn require_shift(&self, id: Ulid) -> Result<ShiftAssignment, EngineError> {
        self.store
            .shift(id)
            .await
            .map_err(persistence)?
            .ok_or(EngineError::NotFound(EntityKind::Shift, id))
    }

    pub(super) async fn require_employee(&self, id: Ulid) -> Result<Employee, EngineError> {
        self.store
            .employee(id)
            .await
            .map_err(persistence)?
            .ok_or(EngineError::NotFound(EntityKind::Employee, id))
    }

    pub(super) async fn require_constraint(&self, id: Ulid) -> Result<Constraint, EngineError> {
        self.store
            .constraint(id)
            .await
            .map_err(persistence)?
            .ok_or(EngineError::NotFound(EntityKind::Constraint, id))
    }
}

pub(super) fn persistence(e: StoreError) -> EngineError {
    EngineError::Persistence(e.0)
}

pub(super) fn check_note_len(note: &str) -> Result<(), EngineError> {
    if note.len() > limits::MAX_NOTE_LEN {
        return Err(EngineError::LimitExceeded("note too long"));
    }
    Ok(())
}
