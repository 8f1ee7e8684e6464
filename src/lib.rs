// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-appmetrica
//!
//! Incremental extractor for the AppMetrica Logs and Stat APIs.
//!
//! ## Features
//!
//! - **Time-windowed reads**: each stream walks `[cursor, now)` in fixed-width
//!   windows, one request per window
//! - **Patient retries**: constant-wait retry of 202 "export still preparing",
//!   429 and 5xx responses
//! - **CSV and JSON bodies**: unbounded CSV fields, JSON record paths
//! - **Resumable**: the cursor is persisted after every completed window
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_appmetrica::{engine::SyncEngine, http::HttpClient, state::StateManager};
//! use tap_appmetrica::{config::TapConfig, streams::select_streams, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::load("config.yaml")?;
//!     let client = HttpClient::with_auth(config.http_client_config(), config.auth_config())?;
//!     let streams = select_streams(config.streams.as_deref())?;
//!
//!     let mut engine = SyncEngine::new(client, config, StateManager::from_file("state.json")?);
//!     let mut messages = Vec::new();
//!     engine.sync(&streams, &mut messages).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  cli: spec | check | discover | read                          │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴────────────────────────────────┐
//! │  engine: StreamReader → records → cursor saved → STATE        │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────────┬───┴─────────┬───────────┬──────────┐
//! │  streams  │  pagination  │    http     │  decode   │  state   │
//! ├───────────┼──────────────┼─────────────┼───────────┼──────────┤
//! │ events    │ Chunked      │ OAuth token │ CSV       │ JSON doc │
//! │ installs  │ SingleRange  │ Fixed retry │ JSON path │ Atomic   │
//! │ devices   │              │ Rate limit  │           │ write    │
//! └───────────┴──────────────┴─────────────┴───────────┴──────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Token authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Time-window strategies
pub mod pagination;

/// Response decoders (CSV, JSON)
pub mod decode;

/// Stream definitions
pub mod streams;

/// Sync state persistence
pub mod state;

/// Main execution engine
pub mod engine;

/// Tap configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
