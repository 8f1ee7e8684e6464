//! Per-row post-processing
//!
//! Transforms are pure: one row in, at most one row out. Returning `None`
//! vetoes the row.

use crate::types::{parse_datetime, JsonObject, JsonValue};
use serde_json::{Map, Number};

/// Row transform attached to a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RowTransform {
    /// Pass rows through unchanged
    #[default]
    Identity,

    /// Add `target` as the calendar date of the datetime in `source`.
    ///
    /// Rows whose source is empty or unparseable keep no `target` and are later
    /// dropped by the cursor filter.
    DeriveDate {
        /// Datetime field to read
        source: String,
        /// Date field to write
        target: String,
    },

    /// Reshape a stat row `{dimensions:[{name}], metrics:[v]}` into
    /// `{<date_field>: name, <metric_field>: v}`
    DimensionMetric {
        /// Output name of the first dimension
        date_field: String,
        /// Output name of the first metric
        metric_field: String,
    },
}

impl RowTransform {
    /// Date derived from a datetime field
    pub fn derive_date(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DeriveDate {
            source: source.into(),
            target: target.into(),
        }
    }

    /// First dimension and first metric as flat fields
    pub fn dimension_metric(
        date_field: impl Into<String>,
        metric_field: impl Into<String>,
    ) -> Self {
        Self::DimensionMetric {
            date_field: date_field.into(),
            metric_field: metric_field.into(),
        }
    }

    /// Apply to one row
    pub fn apply(&self, mut row: JsonObject) -> Option<JsonObject> {
        match self {
            RowTransform::Identity => Some(row),

            RowTransform::DeriveDate { source, target } => {
                let date = row
                    .get(source)
                    .and_then(JsonValue::as_str)
                    .and_then(parse_datetime)
                    .map(|dt| dt.format("%Y-%m-%d").to_string());
                if let Some(date) = date {
                    row.insert(target.clone(), JsonValue::String(date));
                }
                Some(row)
            }

            RowTransform::DimensionMetric {
                date_field,
                metric_field,
            } => {
                let date = row
                    .get("dimensions")?
                    .as_array()?
                    .first()?
                    .get("name")?
                    .as_str()?
                    .to_string();
                let metric = row.get("metrics")?.as_array()?.first()?;
                let metric = normalize_number(metric)?;

                let mut out = Map::new();
                out.insert(date_field.clone(), JsonValue::String(date));
                out.insert(metric_field.clone(), metric);
                Some(out)
            }
        }
    }
}

/// Stat metrics arrive as floats; whole values are emitted as integers
fn normalize_number(value: &JsonValue) -> Option<JsonValue> {
    let JsonValue::Number(number) = value else {
        return None;
    };
    if number.is_i64() || number.is_u64() {
        return Some(JsonValue::Number(number.clone()));
    }

    let float = number.as_f64()?;
    if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        return Some(JsonValue::Number(Number::from(float as i64)));
    }
    Number::from_f64(float).map(JsonValue::Number)
}
