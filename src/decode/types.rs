//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use super::decoders::{CsvDecoder, JsonDecoder};
use crate::error::Result;
use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Format of the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON format
    Json,
    /// CSV format with a header row (default for log exports)
    #[default]
    Csv,
}

/// Configuration for decoding responses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Response format
    pub format: DecoderFormat,
    /// Path to the records array (JSON only)
    pub record_path: Option<String>,
}

impl DecoderConfig {
    /// Create a CSV decoder config
    pub fn csv() -> Self {
        Self {
            format: DecoderFormat::Csv,
            record_path: None,
        }
    }

    /// Create a JSON decoder config with a record path
    pub fn json_with_path(path: impl Into<String>) -> Self {
        Self {
            format: DecoderFormat::Json,
            record_path: Some(path.into()),
        }
    }
}

/// Trait for decoding response bodies into rows
pub trait RecordDecoder: Send + Sync {
    /// Decode rows from `reader`, handing each to `emit` as soon as it is parsed.
    ///
    /// An error from `emit` stops decoding and is returned as is.
    fn decode_each(
        &self,
        reader: &mut dyn Read,
        emit: &mut dyn FnMut(JsonObject) -> Result<()>,
    ) -> Result<()>;

    /// Decode a whole in-memory body into a list of row objects
    fn decode(&self, body: &[u8]) -> Result<Vec<JsonObject>> {
        let mut rows = Vec::new();
        let mut reader = body;
        self.decode_each(&mut reader, &mut |row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(rows)
    }
}

/// Build the decoder described by a config
pub fn build_decoder(config: &DecoderConfig) -> Box<dyn RecordDecoder> {
    match config.format {
        DecoderFormat::Csv => Box::new(CsvDecoder::new()),
        DecoderFormat::Json => match &config.record_path {
            Some(path) => Box::new(JsonDecoder::with_path(path.clone())),
            None => Box::new(JsonDecoder::new()),
        },
    }
}
