//! Window strategy implementations
//!
//! Each strategy handles a specific paging model.

use super::types::{Window, WindowStrategy};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};

// ============================================================================
// Chunked Windows
// ============================================================================

/// Fixed-width windows from the cursor up to `now`.
///
/// The last window is clamped to `now`, so the windows tile `[start, now)`
/// exactly and the final cursor is `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedWindows {
    step: Duration,
}

impl ChunkedWindows {
    /// Create a strategy stepping by `step`; zero or negative steps are rejected
    pub fn new(step: Duration) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(Error::invalid_value(
                "chunk_days",
                format!("window width must be positive, got {step}"),
            ));
        }
        Ok(Self { step })
    }

    /// Windows of `days` whole days
    pub fn days(days: i64) -> Result<Self> {
        let step = Duration::try_days(days).ok_or_else(|| {
            Error::invalid_value("chunk_days", format!("{days} days is out of range"))
        })?;
        Self::new(step)
    }

    /// Width of a full window
    pub fn step(&self) -> Duration {
        self.step
    }
}

impl WindowStrategy for ChunkedWindows {
    fn next_window(&self, cursor: DateTime<Utc>, now: DateTime<Utc>) -> Option<Window> {
        if cursor >= now {
            return None;
        }
        let until = cursor
            .checked_add_signed(self.step)
            .map_or(now, |end| end.min(now));
        Some(Window::new(cursor, until))
    }

    fn name(&self) -> &'static str {
        "chunked"
    }
}

// ============================================================================
// Single Range
// ============================================================================

/// One window spanning the whole `[cursor, now)` range.
///
/// Used by aggregate endpoints that group by day server-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleRange;

impl SingleRange {
    /// Create a new single-range strategy
    pub fn new() -> Self {
        Self
    }
}

impl WindowStrategy for SingleRange {
    fn next_window(&self, cursor: DateTime<Utc>, now: DateTime<Utc>) -> Option<Window> {
        (cursor < now).then(|| Window::new(cursor, now))
    }

    fn name(&self) -> &'static str {
        "single_range"
    }
}
