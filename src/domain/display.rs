//! Presentation fields derived from an entry.
//!
//! Pure formatting of `size_bytes` and `created_at_millis`; nothing here
//! feeds back into ordering or validation.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use super::entry::{ContentEntry, ContentKind, EntryId};

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Human-readable size: bytes below 1KB, then KB or MB to two decimals
pub fn human_size(bytes: u64) -> String {
    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.2} KB", value / KB)
    } else {
        format!("{:.2} MB", value / MB)
    }
}

/// Date of a commit timestamp in the given time zone, formatted with `pattern`
pub fn format_timestamp<Tz>(millis: i64, tz: &Tz, pattern: &str) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(utc.with_timezone(tz).format(pattern).to_string())
}

/// Commit date in the local time zone using the locale's date representation
pub fn local_date(millis: i64) -> String {
    format_timestamp(millis, &Local, "%x").unwrap_or_else(|| "-".to_string())
}

/// One row of the rendered catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub id: EntryId,
    pub title: String,
    pub name: String,
    pub kind: ContentKind,
    pub size: String,
    pub date: String,

    /// Character count, shown for text entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
}

impl DisplayRow {
    pub fn from_entry(entry: &ContentEntry) -> Self {
        Self {
            id: entry.id(),
            title: entry.title().to_string(),
            name: entry.original_name().to_string(),
            kind: entry.kind(),
            size: human_size(entry.size_bytes()),
            date: local_date(entry.created_at_millis()),
            characters: entry.text().map(|t| t.chars().count()),
        }
    }
}
