//! Decoder implementations
//!
//! Each decoder handles a specific response format.

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use crate::types::JsonObject;
use serde_json::{Map, Value};
use std::io::Read;
use tracing::debug;

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder for log exports.
///
/// The first record is the header. Fields have no size ceiling and quoted
/// fields may span lines. Values stay strings, exactly as exported; invalid
/// UTF-8 is replaced with U+FFFD rather than failing the body.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    /// Field delimiter
    delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvDecoder {
    /// Create a new CSV decoder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with a custom delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode_each(
        &self,
        reader: &mut dyn Read,
        emit: &mut dyn FnMut(JsonObject) -> Result<()>,
    ) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| normalize_header(&String::from_utf8_lossy(h)))
            .collect();

        let mut record = csv::ByteRecord::new();

        // Rows of empty fields are kept; the cursor filter counts them as dropped
        while reader.read_byte_record(&mut record)? {
            // Short rows are padded, extra trailing values are dropped
            let row: Map<String, Value> = headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = record.get(i).map(String::from_utf8_lossy).unwrap_or_default();
                    (header.clone(), Value::String(value.into_owned()))
                })
                .collect();

            emit(row)?;
        }

        Ok(())
    }
}

/// Header names are matched case-insensitively against field lists
fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
}

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Path to the records array
    record_path: Option<String>,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }

    /// Extract records from a JSON value using the configured path
    fn extract_records(&self, value: Value) -> Result<Vec<Value>> {
        match &self.record_path {
            Some(path) if path.contains('*') => extract_with_jsonpath(&value, path),
            Some(path) => match extract_simple_path(&value, path) {
                Some(Value::Array(arr)) => Ok(arr),
                Some(Value::Null) | None => Ok(vec![]),
                Some(v) => Ok(vec![v]),
            },
            None => match value {
                Value::Array(arr) => Ok(arr),
                v => Ok(vec![v]),
            },
        }
    }
}

impl RecordDecoder for JsonDecoder {
    /// Stat API reports are small, so the document is read whole before
    /// records are extracted.
    fn decode_each(
        &self,
        reader: &mut dyn Read,
        emit: &mut dyn FnMut(JsonObject) -> Result<()>,
    ) -> Result<()> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })?;

        for item in self.extract_records(value)? {
            match item {
                Value::Object(row) => emit(row)?,
                other => debug!("Skipping non-object JSON record: {other}"),
            }
        }

        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path (`data`, `$.data.rows`, `data[0]`)
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index: usize = part[bracket_pos + 1..].trim_end_matches(']').parse().ok()?;

            if !name.is_empty() {
                current = current.get(name)?;
            }
            current = current.as_array()?.get(index)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath '{path}': {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
