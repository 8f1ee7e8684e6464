//! Execution engine module
//!
//! Runs streams window by window and emits records and state.
//!
//! # Overview
//!
//! The engine module provides:
//! - `StreamReader` - Fetches one stream's windows in order and decodes them as they download
//! - `SyncEngine` - Emits records, persists the cursor and emits state per window
//! - Message types for output (Record, State, Log)

mod reader;
mod types;

pub use reader::{StreamReader, WindowFetcher};
pub use types::{CompletedWindow, Message, ReadEvent, StreamStats, StreamStatus, SyncStats};

use crate::config::TapConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::state::StateManager;
use crate::streams::StreamDefinition;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::time::Instant;
use tracing::{error, info};

/// Receives messages as they are produced
pub trait MessageSink {
    /// Emit one message
    fn emit(&mut self, message: &Message) -> Result<()>;
}

impl MessageSink for Vec<Message> {
    fn emit(&mut self, message: &Message) -> Result<()> {
        self.push(message.clone());
        Ok(())
    }
}

/// Sync engine for orchestrating data extraction
pub struct SyncEngine<F: WindowFetcher = HttpClient> {
    /// Response source
    fetcher: F,
    /// Tap configuration
    config: TapConfig,
    /// State manager
    state: StateManager,
    /// Statistics
    stats: SyncStats,
}

impl<F: WindowFetcher> SyncEngine<F> {
    /// Create a new sync engine
    pub fn new(fetcher: F, config: TapConfig, state: StateManager) -> Self {
        Self {
            fetcher,
            config,
            state,
            stats: SyncStats::default(),
        }
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every stream in order, stopping at the first failure
    pub async fn sync(
        &mut self,
        streams: &[&StreamDefinition],
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        self.sync_at(streams, Utc::now(), sink).await
    }

    /// Sync every stream against a fixed `now`
    pub async fn sync_at(
        &mut self,
        streams: &[&StreamDefinition],
        now: DateTime<Utc>,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let start = Instant::now();
        let mut result = Ok(());

        for stream in streams {
            if let Err(e) = self.sync_stream(stream, now, sink).await {
                result = Err(e);
                break;
            }
        }

        self.stats.set_duration(start.elapsed().as_millis() as u64);
        result
    }

    /// Sync one stream.
    ///
    /// For each window: records are emitted as they are decoded, then the
    /// cursor is persisted, then the full state is emitted. A failed window
    /// leaves the cursor where the previous window put it.
    pub async fn sync_stream(
        &mut self,
        stream: &StreamDefinition,
        now: DateTime<Utc>,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let start = Instant::now();
        let mut stats = StreamStats::new(&stream.name);

        let result = self.run_stream(stream, now, sink, &mut stats).await;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(
                "Completed sync for '{}': {} records in {} windows ({} rows dropped)",
                stream.name, stats.records_synced, stats.windows, stats.rows_dropped
            ),
            Err(e) => {
                error!("Sync for '{}' failed: {e}", stream.name);
                stats.fail(e);
            }
        }
        self.stats.streams.push(stats);

        result
    }

    async fn run_stream(
        &self,
        stream: &StreamDefinition,
        now: DateTime<Utc>,
        sink: &mut dyn MessageSink,
        stats: &mut StreamStats,
    ) -> Result<()> {
        let prior = self.state.get_cursor(&stream.name).await;
        let reader =
            StreamReader::new(stream, &self.config, &self.fetcher, prior.as_deref(), now)?;

        sink.emit(&Message::info(format!(
            "Starting sync for stream '{}' from {}",
            stream.name,
            reader.cursor()
        )))?;

        let events = reader.into_stream();
        futures::pin_mut!(events);

        while let Some(event) = events.try_next().await? {
            match event {
                ReadEvent::Record(record) => {
                    sink.emit(&Message::record(&stream.name, record))?;
                }
                ReadEvent::WindowDone(done) => {
                    stats.add_window(done.records, done.rows_dropped);
                    self.state.set_cursor(&stream.name, done.cursor).await?;
                    sink.emit(&Message::state(self.state.snapshot().await))?;
                }
            }
        }

        Ok(())
    }
}
