//! Pagination module
//!
//! Supports: chunked time windows and a single whole-range window
//!
//! # Overview
//!
//! The logs API is paged by time, not by token: every request asks for one
//! `[since, until)` window. A [`WindowStrategy`] decides the next window from
//! the current cursor and a fixed upper bound, and what the cursor becomes
//! once that window has been fully consumed. Strategies are pure; nothing
//! here performs I/O or touches persisted state.

mod strategies;
mod types;

pub use strategies::{ChunkedWindows, SingleRange};
pub use types::{Window, WindowStrategy, Windows};
