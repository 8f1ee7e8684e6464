//! Sync state
//!
//! One cursor per stream, persisted between runs so incremental syncs resume
//! where the last completed window ended. The document shape is
//! `{"streams": {"<name>": {"cursor": "..."}}}`.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{State, StreamState};
