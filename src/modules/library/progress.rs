//! Status and progress rules applied when a user updates a library entry.
//!
//! Rules, in order:
//! 1. at least one of status / progress must be present;
//! 2. status must be one of the known reading statuses;
//! 3. progress must lie in `0..=100`;
//! 4. `reading` stamps `started_reading_at`; `finished` stamps
//!    `finished_reading_at` and forces progress to 100 whatever was sent;
//! 5. `last_progress_update_at` is always stamped.

use serde_json::Value;
use time::OffsetDateTime;

use shelf_db::{EntryUpdate, ReadingStatus};

use super::error::ValidationError;
use super::models::UpdateProgressRequest;

const PROGRESS_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

/// Validate a requested change and turn it into the field update to persist.
pub fn compute_update(
    request: &UpdateProgressRequest,
    now: OffsetDateTime,
) -> Result<EntryUpdate, ValidationError> {
    if request.status.is_none() && request.progress.is_none() {
        return Err(ValidationError::NothingToUpdate);
    }

    let status = request.status.as_ref().map(parse_status).transpose()?;
    let mut progress_percentage = request.progress.as_ref().map(parse_progress).transpose()?;

    let mut update = EntryUpdate {
        status,
        progress_percentage: None,
        started_reading_at: None,
        finished_reading_at: None,
        last_progress_update_at: now,
    };

    match status {
        Some(ReadingStatus::Reading) => update.started_reading_at = Some(now),
        Some(ReadingStatus::Finished) => {
            update.finished_reading_at = Some(now);
            progress_percentage = Some(100);
        }
        Some(ReadingStatus::ToRead) | Some(ReadingStatus::Abandoned) | None => {}
    }
    update.progress_percentage = progress_percentage;

    Ok(update)
}

fn parse_status(value: &Value) -> Result<ReadingStatus, ValidationError> {
    match value {
        Value::String(raw) => raw
            .parse()
            .map_err(|_| ValidationError::InvalidStatus(raw.clone())),
        other => Err(ValidationError::InvalidStatus(other.to_string())),
    }
}

/// Whole numbers in range only; any other JSON value is out of range.
fn parse_progress(value: &Value) -> Result<i16, ValidationError> {
    value
        .as_i64()
        .filter(|progress| PROGRESS_RANGE.contains(progress))
        .and_then(|progress| i16::try_from(progress).ok())
        .ok_or_else(|| ValidationError::ProgressOutOfRange(value.clone()))
}
