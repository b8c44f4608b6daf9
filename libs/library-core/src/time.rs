//! Timestamp parsing for global records.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ContentError, Result};

/// Parse an optional timestamp from the global service.
///
/// Accepts RFC 3339 (`2024-01-02T03:04:05.000000Z`) and the plain
/// `YYYY-MM-DD HH:MM:SS` form, read as UTC. Absent or blank input stays
/// absent; it is never replaced by the current time.
pub fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| ContentError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Format for storage in the local database.
pub fn to_storage(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}
