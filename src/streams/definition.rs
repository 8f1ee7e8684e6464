//! Stream definition type
//!
//! A stream is data, not code: the engine asks the definition for its window
//! strategy, request parameters and row pipeline.

use super::request::RequestParams;
use super::schema::StreamSchema;
use super::transform::RowTransform;
use crate::config::TapConfig;
use crate::decode::{build_decoder, DecoderConfig};
use crate::error::Result;
use crate::pagination::{ChunkedWindows, SingleRange, Window, WindowStrategy};
use crate::types::{parse_datetime, CursorGranularity, JsonObject, JsonValue, Record, SyncMode};
use chrono::Duration;
use serde_json::json;
use tracing::debug;

/// Logs API datetime parameter format
const LOGS_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stat API date parameter format
const STAT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Row limit for a stat report covering `days` days.
///
/// One row per day comes back, so the limit never drops below the day count
/// and a long backfill is not cut at the API's default page size.
fn stat_limit(config: &TapConfig, days: i64) -> String {
    let requested = config
        .limit
        .as_deref()
        .and_then(|limit| limit.trim().parse::<i64>().ok());
    requested.map_or(days, |limit| limit.max(days)).to_string()
}

/// Width of a chunked stream's windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    /// `chunk_days` from the config
    ChunkDays,
    /// Fixed number of days
    Days(i64),
}

/// Which window strategy a stream uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Fixed-width windows
    Chunked(WindowStep),
    /// One window from the cursor to now
    SingleRange,
}

/// Endpoint family and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Logs API raw export
    LogsExport {
        /// `date_dimension` parameter (`receive` or `default`)
        date_dimension: String,
        /// Columns requested through `fields`
        fields: Vec<String>,
    },
    /// Stat API aggregated report
    StatData {
        /// `metrics` parameter
        metric: String,
        /// `dimensions` parameter, also used as sort key
        dimension: String,
    },
}

/// Rows kept and dropped for one response body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedRows {
    /// Records to emit
    pub records: Vec<Record>,
    /// Rows vetoed by the transform or lacking a valid cursor
    pub dropped: usize,
}

/// Static description of one stream
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Endpoint path
    pub path: String,
    /// Response body format
    pub decoder: DecoderConfig,
    /// Endpoint family
    pub endpoint: Endpoint,
    /// Emitted record schema
    pub schema: StreamSchema,
    /// Replication key
    pub cursor_field: String,
    /// Resolution of the replication key
    pub granularity: CursorGranularity,
    /// Window strategy
    pub strategy: StrategyKind,
    /// Per-row post-processing
    pub transform: RowTransform,
}

impl StreamDefinition {
    /// Build the window strategy for this run
    pub fn build_strategy(&self, config: &TapConfig) -> Result<Box<dyn WindowStrategy>> {
        let strategy: Box<dyn WindowStrategy> = match self.strategy {
            StrategyKind::Chunked(WindowStep::ChunkDays) => {
                Box::new(ChunkedWindows::new(config.chunk_width()?)?)
            }
            StrategyKind::Chunked(WindowStep::Days(days)) => {
                Box::new(ChunkedWindows::days(days)?)
            }
            StrategyKind::SingleRange => Box::new(SingleRange::new()),
        };
        Ok(strategy)
    }

    /// Request parameters for one window
    pub fn request_params(&self, config: &TapConfig, window: &Window) -> RequestParams {
        let params = RequestParams::new(self.path.clone());

        match &self.endpoint {
            Endpoint::LogsExport {
                date_dimension,
                fields,
            } => params
                .param("application_id", config.application_id.clone())
                .param("date_since", window.since.format(LOGS_DATETIME_FORMAT).to_string())
                .param("date_until", window.until.format(LOGS_DATETIME_FORMAT).to_string())
                .param("date_dimension", date_dimension.clone())
                .param("fields", fields.join(","))
                .param_opt("limit", config.limit.as_deref()),

            Endpoint::StatData { metric, dimension } => {
                // date2 is inclusive
                let first_day = window.since.date_naive();
                let last_day = (window.until - Duration::seconds(1)).date_naive();
                params
                    .param("ids", config.application_id.clone())
                    .param("date1", first_day.format(STAT_DATE_FORMAT).to_string())
                    .param("date2", last_day.format(STAT_DATE_FORMAT).to_string())
                    .param("metrics", metric.clone())
                    .param("dimensions", dimension.clone())
                    .param("group", "day")
                    .param("sort", dimension.clone())
                    .param("limit", stat_limit(config, (last_day - first_day).num_days() + 1))
            }
        }
    }

    /// Decode a response body and run the row pipeline.
    ///
    /// Fails only when the body itself cannot be decoded.
    pub fn parse(&self, body: &[u8]) -> Result<ProcessedRows> {
        let rows = build_decoder(&self.decoder).decode(body)?;
        Ok(self.process_rows(rows))
    }

    /// Transform rows and drop those without a valid cursor value
    pub fn process_rows(&self, rows: Vec<JsonObject>) -> ProcessedRows {
        let mut processed = ProcessedRows {
            records: Vec::with_capacity(rows.len()),
            dropped: 0,
        };

        for row in rows {
            match self.process_row(row) {
                Some(record) => processed.records.push(record),
                None => processed.dropped += 1,
            }
        }

        processed
    }

    /// Transform one row; `None` means it was dropped
    pub fn process_row(&self, row: JsonObject) -> Option<Record> {
        match self.transform.apply(row) {
            Some(row) if self.has_valid_cursor(&row) => Some(row),
            Some(row) => {
                debug!(
                    "Dropping {} row without valid '{}': {:?}",
                    self.name,
                    self.cursor_field,
                    row.get(&self.cursor_field)
                );
                None
            }
            None => {
                debug!("Dropping {} row rejected by transform", self.name);
                None
            }
        }
    }

    fn has_valid_cursor(&self, row: &JsonObject) -> bool {
        row.get(&self.cursor_field)
            .and_then(JsonValue::as_str)
            .and_then(parse_datetime)
            .is_some()
    }

    /// Catalog entry printed by `discover`
    pub fn catalog_entry(&self) -> JsonValue {
        json!({
            "name": self.name,
            "json_schema": self.schema.to_json_schema(),
            "supported_sync_modes": [SyncMode::Incremental],
            "source_defined_cursor": true,
            "default_cursor_field": [self.cursor_field],
            "cursor_granularity": self.granularity,
        })
    }
}
