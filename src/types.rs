//! Common types used throughout tap-appmetrica
//!
//! This module contains shared type definitions, type aliases,
//! and the date/time helpers every cursor goes through.

use chrono::{
    DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, SubsecRound, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single emitted row: flat field name to value mapping
pub type Record = JsonObject;

// ============================================================================
// Sync Mode
// ============================================================================

/// Synchronization mode for streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Incremental - only fetch new data
    #[default]
    Incremental,
}

// ============================================================================
// Log Level
// ============================================================================

/// Level carried by LOG messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// ============================================================================
// Cursor Granularity
// ============================================================================

/// Resolution of a stream's replication cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorGranularity {
    /// Calendar day, persisted as `YYYY-MM-DD`
    Date,
    /// Instant, persisted as RFC 3339
    #[default]
    DateTime,
}

impl CursorGranularity {
    /// Round a timestamp down to this granularity.
    ///
    /// Datetime cursors are persisted in whole seconds, so sub-second
    /// precision is dropped here too.
    pub fn truncate(self, value: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            CursorGranularity::Date => start_of_day(value.date_naive()),
            CursorGranularity::DateTime => value.trunc_subsecs(0),
        }
    }

    /// Format a cursor for the state document
    pub fn format_cursor(self, value: DateTime<Utc>) -> String {
        match self {
            CursorGranularity::Date => value.format("%Y-%m-%d").to_string(),
            CursorGranularity::DateTime => value.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Parse a cursor read back from the state document
    pub fn parse_cursor(self, value: &str) -> Option<DateTime<Utc>> {
        parse_datetime(value).map(|dt| self.truncate(dt))
    }

    /// JSON schema `format` for fields of this granularity
    pub fn schema_format(self) -> &'static str {
        match self {
            CursorGranularity::Date => "date",
            CursorGranularity::DateTime => "date-time",
        }
    }
}

// ============================================================================
// Date/time helpers
// ============================================================================

/// Midnight UTC of the given day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Parse the date and datetime shapes found in configs, state files and API rows.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`.
/// Naive values are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}
