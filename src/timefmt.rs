//! Timestamp serialization.
//!
//! All JSON payloads carry ISO-8601 timestamps with a numeric offset,
//! e.g. `2023-02-25 16:30:00+00:00`.

use chrono::{DateTime, Utc};

/// Formats an instant the way every payload serializes it.
#[must_use]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}
