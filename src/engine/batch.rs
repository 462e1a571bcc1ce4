//! Apply one resolution template across many conflicts. Items are processed
//! strictly in order; each runs as its own transactional unit, so one
//! failure never rolls back or blocks the rest.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use ulid::Ulid;

use crate::model::{Conflict, ConflictKind, ResolutionKind};
use crate::notify;
use crate::observability;

use super::resolve::{ResolutionFailure, ResolutionPayload, ResolutionRequest};
use super::{Engine, EngineError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub conflict_id: Ulid,
    pub success: bool,
    pub failure: Option<ResolutionFailure>,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub resolution_type: ResolutionKind,
    pub results: Vec<BatchItemResult>,
}

impl Engine {
    /// Resolve each conflict with a per-conflict customization of
    /// `template`, in apply mode. Missing conflicts and failed resolutions
    /// become per-item failure records; counts always sum to the input
    /// length.
    pub async fn batch_resolve(
        &self,
        conflict_ids: &[Ulid],
        template: ResolutionPayload,
        actor: &str,
    ) -> Result<BatchSummary, EngineError> {
        if conflict_ids.len() > self.config.max_batch_size {
            return Err(EngineError::LimitExceeded("batch too large"));
        }

        let kind = template.kind();
        let mut results = Vec::with_capacity(conflict_ids.len());
        let mut schedules: BTreeSet<Ulid> = BTreeSet::new();

        for &conflict_id in conflict_ids {
            let conflict = match self.get_conflict(conflict_id).await {
                Ok(Some(conflict)) => conflict,
                Ok(None) => {
                    warn!(conflict = %conflict_id, "batch item skipped: conflict missing");
                    results.push(BatchItemResult {
                        conflict_id,
                        success: false,
                        failure: Some(ResolutionFailure {
                            kind: "not_found".into(),
                            message: format!("conflict not found: {conflict_id}"),
                        }),
                        details: Value::Null,
                    });
                    continue;
                }
                Err(e) => {
                    results.push(BatchItemResult {
                        conflict_id,
                        success: false,
                        failure: Some(ResolutionFailure {
                            kind: e.kind().into(),
                            message: e.to_string(),
                        }),
                        details: Value::Null,
                    });
                    continue;
                }
            };
            schedules.insert(conflict.schedule_id);

            let payload = customize_template(&template, &conflict);
            let result = self
                .resolve(
                    conflict_id,
                    ResolutionRequest {
                        payload,
                        apply_immediately: true,
                        actor: Some(actor.to_string()),
                    },
                )
                .await;
            results.push(BatchItemResult {
                conflict_id,
                success: result.success,
                failure: result.error,
                details: result.details,
            });
        }

        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        metrics::counter!(observability::BATCH_ITEMS_TOTAL, "status" => "success")
            .increment(successful as u64);
        metrics::counter!(observability::BATCH_ITEMS_TOTAL, "status" => "failed")
            .increment(failed as u64);

        for schedule_id in &schedules {
            self.notify.emit(
                *schedule_id,
                notify::CONFLICTS_BATCH_RESOLVED,
                json!({
                    "resolution_type": kind.as_str(),
                    "total": results.len(),
                    "successful": successful,
                    "failed": failed,
                    "actor": actor,
                }),
            );
        }
        info!(
            total = results.len(),
            successful, failed, kind = kind.as_str(), actor,
            "batch resolution finished"
        );

        Ok(BatchSummary {
            total: results.len(),
            successful,
            failed,
            resolution_type: kind,
            results,
        })
    }
}

/// Substitute conflict-specific identifiers into a shared template. Shift
/// ids that already belong to the conflict pass through untouched.
fn customize_template(template: &ResolutionPayload, conflict: &Conflict) -> ResolutionPayload {
    let known = |id: &Ulid| conflict.shifts.iter().any(|s| s.shift_id == *id);

    match template {
        ResolutionPayload::AdjustTimes { adjustments } => {
            // Adjustment i targets the conflict's i-th affected shift.
            let adjustments = adjustments
                .iter()
                .enumerate()
                .map(|(i, adjustment)| {
                    let mut adjustment = adjustment.clone();
                    if !known(&adjustment.shift_id)
                        && let Some(snapshot) = conflict.shifts.get(i)
                    {
                        adjustment.shift_id = snapshot.shift_id;
                    }
                    adjustment
                })
                .collect();
            ResolutionPayload::AdjustTimes { adjustments }
        }
        ResolutionPayload::ReassignEmployee {
            shift_id,
            new_employee_id,
        } if !known(shift_id) => ResolutionPayload::ReassignEmployee {
            shift_id: pick_shift(conflict).unwrap_or(*shift_id),
            new_employee_id: *new_employee_id,
        },
        ResolutionPayload::SplitShift {
            shift_id,
            split_min,
        } if !known(shift_id) => ResolutionPayload::SplitShift {
            shift_id: conflict
                .shifts
                .first()
                .map(|s| s.shift_id)
                .unwrap_or(*shift_id),
            split_min: *split_min,
        },
        ResolutionPayload::RemoveShift { shift_id } if !known(shift_id) => {
            ResolutionPayload::RemoveShift {
                shift_id: pick_shift(conflict).unwrap_or(*shift_id),
            }
        }
        ResolutionPayload::AddRestDay { employee_id, day } => ResolutionPayload::AddRestDay {
            employee_id: *conflict.employee_ids.first().unwrap_or(employee_id),
            day: *conflict.days.first().unwrap_or(day),
        },
        other => other.clone(),
    }
}

/// For overlap pairs, target the later-starting shift so the earlier one
/// survives intact; otherwise the first affected shift.
fn pick_shift(conflict: &Conflict) -> Option<Ulid> {
    match conflict.kind {
        ConflictKind::Overlap => conflict.shifts.last().map(|s| s.shift_id),
        _ => conflict.shifts.first().map(|s| s.shift_id),
    }
}
