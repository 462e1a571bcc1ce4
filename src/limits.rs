//! Hard input limits. Checked at mutation entry points before any state
//! changes; violations surface as `EngineError::LimitExceeded`.

use crate::model::Day;

/// Shifts a single detection pass will scan.
pub const MAX_SHIFTS_PER_SCHEDULE: usize = 50_000;

/// Conflict ids per batch_resolve call.
pub const MAX_BATCH_SIZE: usize = 500;

/// Shift adjustments per adjust_times request.
pub const MAX_ADJUSTMENTS_PER_REQUEST: usize = 100;

/// New shift specs per add_coverage request.
pub const MAX_COVERAGE_SPECS: usize = 100;

/// Free-text note / reason / action length in bytes.
pub const MAX_NOTE_LEN: usize = 2_000;

/// Valid epoch-day range: 1970-01-01 .. ~2150.
pub const MIN_VALID_DAY: Day = 0;
pub const MAX_VALID_DAY: Day = 66_000;
