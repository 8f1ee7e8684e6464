//! Pagination types and traits
//!
//! Defines the window abstraction shared by all strategies.

use chrono::{DateTime, Utc};

/// A half-open time range `[since, until)` fetched by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    /// Inclusive lower bound
    pub since: DateTime<Utc>,
    /// Exclusive upper bound
    pub until: DateTime<Utc>,
}

impl Window {
    /// Create a window. Callers guarantee `since < until`.
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        debug_assert!(since < until, "empty window {since} .. {until}");
        Self { since, until }
    }

    /// Length of the window
    pub fn duration(&self) -> chrono::Duration {
        self.until - self.since
    }

    /// Whether `instant` falls inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.since <= instant && instant < self.until
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.since, self.until)
    }
}

/// Trait for window pagination strategies
pub trait WindowStrategy: Send + Sync + std::fmt::Debug {
    /// The window to request next, or `None` once `cursor >= now`
    fn next_window(&self, cursor: DateTime<Utc>, now: DateTime<Utc>) -> Option<Window>;

    /// Cursor value after `window` has been fully processed
    fn next_cursor(&self, window: &Window) -> DateTime<Utc> {
        window.until
    }

    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Every window between `start` and `now`, in order
    fn windows(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> Windows<'_>
    where
        Self: Sized,
    {
        Windows {
            strategy: self,
            cursor: start,
            now,
        }
    }
}

/// Iterator over the windows a strategy visits
#[derive(Debug)]
pub struct Windows<'a> {
    strategy: &'a dyn WindowStrategy,
    cursor: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl<'a> Windows<'a> {
    /// Iterate windows of a boxed or borrowed strategy
    pub fn new(
        strategy: &'a dyn WindowStrategy,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            strategy,
            cursor: start,
            now,
        }
    }

    /// Cursor after the windows yielded so far
    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }
}

impl Iterator for Windows<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let window = self.strategy.next_window(self.cursor, self.now)?;
        self.cursor = self.strategy.next_cursor(&window);
        Some(window)
    }
}
