//! Engine types
//!
//! Output messages, read events and sync statistics.

use crate::pagination::Window;
use crate::state::State;
use crate::types::{LogLevel, Record};
use serde::Serialize;
use serde_json::{json, Value};

// ============================================================================
// Messages
// ============================================================================

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// One record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: Record,
    },
    /// Full state document after a completed window
    State {
        /// State data
        state: State,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(state: State) -> Self {
        Self::State { state }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Wire form: one JSON object per message
    pub fn to_json(&self) -> Value {
        match self {
            Message::Record { stream, record } => json!({
                "type": "RECORD",
                "stream": stream,
                "record": record,
            }),
            Message::State { state } => json!({
                "type": "STATE",
                "state": state,
            }),
            Message::Log { level, message } => json!({
                "type": "LOG",
                "log": {
                    "level": level,
                    "message": message,
                }
            }),
        }
    }
}

// ============================================================================
// Read Events
// ============================================================================

/// What reading a stream produces, in order
#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    /// A record that passed the row filter
    Record(Record),
    /// The current window's body was read to the end
    WindowDone(CompletedWindow),
}

/// Summary of one fully read window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedWindow {
    /// Stream name
    pub stream: String,
    /// The window that was fetched
    pub window: Window,
    /// Records emitted for the window
    pub records: usize,
    /// Rows dropped by the row filter
    pub rows_dropped: usize,
    /// Cursor to persist now that the window's records are out
    pub cursor: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Outcome of one stream's sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// Every window completed
    Success,
    /// Stopped on a fatal error
    Failed,
}

/// Statistics for one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Stream name
    pub stream: String,
    /// Outcome
    pub status: StreamStatus,
    /// Records emitted
    pub records_synced: usize,
    /// Windows completed
    pub windows: usize,
    /// Rows dropped by the row filter
    pub rows_dropped: usize,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Error message when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamStats {
    /// Empty stats for a stream
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            status: StreamStatus::Success,
            records_synced: 0,
            windows: 0,
            rows_dropped: 0,
            duration_ms: 0,
            error: None,
        }
    }

    /// Count a completed window
    pub fn add_window(&mut self, records: usize, rows_dropped: usize) {
        self.windows += 1;
        self.records_synced += records;
        self.rows_dropped += rows_dropped;
    }

    /// Mark as failed
    pub fn fail(&mut self, error: impl ToString) {
        self.status = StreamStatus::Failed;
        self.error = Some(error.to_string());
    }
}

/// Statistics for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Per-stream stats in sync order
    pub streams: Vec<StreamStats>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across streams
    pub fn total_records(&self) -> usize {
        self.streams.iter().map(|s| s.records_synced).sum()
    }

    /// Total windows across streams
    pub fn total_windows(&self) -> usize {
        self.streams.iter().map(|s| s.windows).sum()
    }

    /// Total dropped rows across streams
    pub fn total_rows_dropped(&self) -> usize {
        self.streams.iter().map(|s| s.rows_dropped).sum()
    }

    /// Number of failed streams
    pub fn failed_streams(&self) -> usize {
        self.streams
            .iter()
            .filter(|s| s.status == StreamStatus::Failed)
            .count()
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }

    /// `SYNC_SUMMARY` message body
    pub fn summary(&self) -> Value {
        let failed = self.failed_streams();
        let status = if failed == 0 {
            "SUCCEEDED"
        } else if failed == self.streams.len() {
            "FAILED"
        } else {
            "PARTIAL"
        };

        json!({
            "type": "SYNC_SUMMARY",
            "summary": {
                "status": status,
                "total_records": self.total_records(),
                "total_windows": self.total_windows(),
                "total_rows_dropped": self.total_rows_dropped(),
                "total_streams": self.streams.len(),
                "failed_streams": failed,
                "duration_ms": self.duration_ms,
                "streams": self.streams,
            }
        })
    }
}
