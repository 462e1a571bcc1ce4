use tracing::info;
use ulid::Ulid;

use crate::model::{ChangeEvent, Conflict, ConflictStatus};
use crate::notify;

use super::{Engine, EngineError, check_note_len, persistence};

/// Conflict lifecycle: `Open` is the only non-terminal state. Resolved and
/// ignored conflicts are never reopened; re-detection of the same underlying
/// inconsistency produces a fresh record on the next pass.
pub(super) fn can_transition(from: ConflictStatus, to: ConflictStatus) -> bool {
    matches!(
        (from, to),
        (ConflictStatus::Open, ConflictStatus::Acknowledged)
            | (ConflictStatus::Open, ConflictStatus::Resolved)
            | (ConflictStatus::Open, ConflictStatus::Ignored)
    )
}

impl Engine {
    /// Manual `open → acknowledged` transition. No shift mutation.
    pub async fn acknowledge_conflict(
        &self,
        conflict_id: Ulid,
        note: Option<String>,
        actor: &str,
    ) -> Result<Conflict, EngineError> {
        self.transition(
            conflict_id,
            ConflictStatus::Acknowledged,
            note,
            actor,
            notify::CONFLICT_ACKNOWLEDGED,
        )
        .await
    }

    /// Manual `open → ignored` transition.
    pub async fn ignore_conflict(
        &self,
        conflict_id: Ulid,
        note: Option<String>,
        actor: &str,
    ) -> Result<Conflict, EngineError> {
        self.transition(
            conflict_id,
            ConflictStatus::Ignored,
            note,
            actor,
            notify::CONFLICT_IGNORED,
        )
        .await
    }

    async fn transition(
        &self,
        conflict_id: Ulid,
        to: ConflictStatus,
        note: Option<String>,
        actor: &str,
        event_name: &'static str,
    ) -> Result<Conflict, EngineError> {
        if let Some(note) = &note {
            check_note_len(note)?;
        }
        let conflict = self.require_conflict(conflict_id).await?;
        if !can_transition(conflict.status, to) {
            return Err(EngineError::BusinessRule(format!(
                "conflict {conflict_id} is {}, cannot become {}",
                conflict.status.as_str(),
                to.as_str()
            )));
        }

        self.store
            .commit(&[ChangeEvent::ConflictStatusChanged {
                conflict_id,
                status: to,
                resolution_notes: note,
                resolved_at: None,
                resolved_by: None,
            }])
            .await
            .map_err(persistence)?;

        self.notify.emit(
            conflict.schedule_id,
            event_name,
            serde_json::json!({
                "conflict_id": conflict_id.to_string(),
                "schedule_id": conflict.schedule_id.to_string(),
                "status": to.as_str(),
                "actor": actor,
            }),
        );
        info!(conflict = %conflict_id, status = to.as_str(), actor, "conflict transitioned");

        self.require_conflict(conflict_id).await
    }
}
