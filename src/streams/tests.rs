//! Tests for stream definitions

use super::*;
use crate::config::TapConfig;
use crate::error::Error;
use crate::pagination::Window;
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn config() -> TapConfig {
    TapConfig {
        application_id: "12345".to_string(),
        token: "token".to_string(),
        chunk_days: 3,
        ..TapConfig::default()
    }
}

fn row(value: Value) -> crate::types::JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_builtin_stream_names() {
    let names: Vec<&str> = builtin_streams().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["events", "installations", "install_devices"]);
}

#[test_case("events", "/logs/v1/export/events.csv", "event_receive_date")]
#[test_case("installations", "/logs/v1/export/installations.csv", "install_receive_date")]
#[test_case("install_devices", "/stat/v1/data", "date")]
fn test_stream_paths_and_cursors(name: &str, path: &str, cursor: &str) {
    let stream = find_stream(name).unwrap();
    assert_eq!(stream.path, path);
    assert_eq!(stream.cursor_field, cursor);
    assert!(stream.schema.field(cursor).unwrap().required);
}

#[test]
fn test_unknown_stream() {
    let err = find_stream("sessions").unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { ref stream } if stream == "sessions"));
}

#[test]
fn test_select_streams() {
    assert_eq!(select_streams(None).unwrap().len(), 3);
    let empty: Vec<String> = Vec::new();
    assert_eq!(select_streams(Some(empty.as_slice())).unwrap().len(), 3);

    let names = vec![
        "install_devices".to_string(),
        "events".to_string(),
        "events".to_string(),
    ];
    let selected: Vec<&str> = select_streams(Some(names.as_slice()))
        .unwrap()
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(selected, vec!["install_devices", "events"]);

    let unknown = vec!["nope".to_string()];
    assert!(select_streams(Some(unknown.as_slice())).is_err());
}

#[test]
fn test_strategies_per_stream() {
    let config = config();
    let events = find_stream("events").unwrap().build_strategy(&config).unwrap();
    let installs = find_stream("installations").unwrap().build_strategy(&config).unwrap();
    let devices = find_stream("install_devices").unwrap().build_strategy(&config).unwrap();

    let start = ts(2024, 1, 1, 0);
    assert_eq!(
        events.next_window(start, ts(2024, 1, 10, 0)),
        Some(Window::new(start, ts(2024, 1, 4, 0)))
    );
    assert_eq!(
        installs.next_window(start, ts(2024, 1, 10, 0)),
        Some(Window::new(start, ts(2024, 1, 2, 0)))
    );
    assert_eq!(
        devices.next_window(start, ts(2024, 1, 10, 0)),
        Some(Window::new(start, ts(2024, 1, 10, 0)))
    );
}

#[test]
fn test_chunked_stream_rejects_bad_width() {
    let mut config = config();
    config.chunk_days = 0;
    assert!(find_stream("events").unwrap().build_strategy(&config).is_err());
}

// ============================================================================
// Request Parameter Tests
// ============================================================================

#[test]
fn test_logs_export_params() {
    let mut config = config();
    config.limit = Some("1000".to_string());
    let stream = find_stream("events").unwrap();
    let window = Window::new(ts(2024, 1, 1, 0), ts(2024, 1, 2, 0));

    let params = stream.request_params(&config, &window);

    assert_eq!(params.path, "/logs/v1/export/events.csv");
    assert_eq!(params.get("application_id"), Some("12345"));
    assert_eq!(params.get("date_since"), Some("2024-01-01 00:00:00"));
    assert_eq!(params.get("date_until"), Some("2024-01-02 00:00:00"));
    assert_eq!(params.get("date_dimension"), Some("receive"));
    assert_eq!(params.get("limit"), Some("1000"));
    let fields = params.get("fields").unwrap();
    assert!(fields.starts_with("event_datetime,event_json,event_name,"));
    assert!(fields.ends_with(",application_id"));
}

#[test]
fn test_logs_export_omits_limit_when_unset() {
    let stream = find_stream("installations").unwrap();
    let window = Window::new(ts(2024, 1, 1, 0), ts(2024, 1, 2, 0));
    let params = stream.request_params(&config(), &window);
    assert_eq!(params.get("limit"), None);
    assert!(params.get("fields").unwrap().contains("install_receive_datetime"));
}

#[test]
fn test_stat_params_use_inclusive_end_date() {
    let stream = find_stream("install_devices").unwrap();
    let window = Window::new(ts(2024, 1, 1, 0), ts(2024, 1, 8, 0));

    let params = stream.request_params(&config(), &window);

    assert_eq!(params.path, "/stat/v1/data");
    assert_eq!(params.get("ids"), Some("12345"));
    assert_eq!(params.get("date1"), Some("2024-01-01"));
    assert_eq!(params.get("date2"), Some("2024-01-07"));
    assert_eq!(params.get("metrics"), Some("ym:i:devices"));
    assert_eq!(params.get("dimensions"), Some("ym:i:date"));
    assert_eq!(params.get("group"), Some("day"));
    assert_eq!(params.get("sort"), Some("ym:i:date"));
    assert_eq!(params.get("limit"), Some("7"));
}

#[test]
fn test_stat_limit_covers_every_day_of_a_long_backfill() {
    let stream = find_stream("install_devices").unwrap();
    let since = ts(2024, 1, 1, 0);
    let window = Window::new(since, since + chrono::Duration::days(200));

    let params = stream.request_params(&config(), &window);

    assert_eq!(params.get("date2"), Some("2024-07-18"));
    assert_eq!(params.get("limit"), Some("200"));
}

#[test_case(Some("1000"), "1000" ; "larger user limit wins")]
#[test_case(Some("5"), "200" ; "smaller user limit is raised")]
#[test_case(Some("lots"), "200" ; "unparseable user limit ignored")]
#[test_case(None, "200" ; "no user limit")]
fn test_stat_limit_against_user_limit(limit: Option<&str>, expected: &str) {
    let stream = find_stream("install_devices").unwrap();
    let since = ts(2024, 1, 1, 0);
    let window = Window::new(since, since + chrono::Duration::days(200));
    let mut config = config();
    config.limit = limit.map(ToString::to_string);

    let params = stream.request_params(&config, &window);

    assert_eq!(params.get("limit"), Some(expected));
}

#[test]
fn test_request_params_to_request_config() {
    let params = RequestParams::new("/x").param("a", "1").param_opt("b", None);
    let config = params.to_request_config();
    assert_eq!(config.get_query("a"), Some("1"));
    assert_eq!(config.query.len(), 1);
}

// ============================================================================
// Transform Tests
// ============================================================================

#[test]
fn test_derive_date_from_datetime() {
    let transform = RowTransform::derive_date("event_receive_datetime", "event_receive_date");
    let out = transform
        .apply(row(json!({"event_receive_datetime": "2024-01-01 23:59:59"})))
        .unwrap();
    assert_eq!(out["event_receive_date"], json!("2024-01-01"));
}

#[test]
fn test_derive_date_leaves_unparseable_rows_alone() {
    let transform = RowTransform::derive_date("event_receive_datetime", "event_receive_date");
    let out = transform
        .apply(row(json!({"event_receive_datetime": ""})))
        .unwrap();
    assert!(!out.contains_key("event_receive_date"));
}

#[test]
fn test_dimension_metric_reshape() {
    let transform = RowTransform::dimension_metric("date", "install_devices");
    let out = transform
        .apply(row(json!({"dimensions": [{"name": "2024-01-01"}], "metrics": [42.0]})))
        .unwrap();
    assert_eq!(Value::Object(out), json!({"date": "2024-01-01", "install_devices": 42}));
}

#[test]
fn test_dimension_metric_keeps_fractional_values() {
    let transform = RowTransform::dimension_metric("date", "m");
    let out = transform
        .apply(row(json!({"dimensions": [{"name": "2024-01-01"}], "metrics": [1.5]})))
        .unwrap();
    assert_eq!(out["m"], json!(1.5));
}

#[test_case(json!({"metrics": [1]}) ; "missing dimensions")]
#[test_case(json!({"dimensions": [], "metrics": [1]}) ; "empty dimensions")]
#[test_case(json!({"dimensions": [{"name": "2024-01-01"}], "metrics": ["x"]}) ; "non numeric metric")]
#[test_case(json!({"dimensions": [{"name": "2024-01-01"}]}) ; "missing metrics")]
fn test_dimension_metric_vetoes_malformed_rows(input: Value) {
    let transform = RowTransform::dimension_metric("date", "install_devices");
    assert_eq!(transform.apply(row(input)), None);
}

// ============================================================================
// Row Pipeline Tests
// ============================================================================

#[test]
fn test_aggregate_body_to_record() {
    let stream = find_stream("install_devices").unwrap();
    let body = br#"{"data":[{"dimensions":[{"name":"2024-01-01"}],"metrics":[42]}]}"#;

    let processed = stream.parse(body).unwrap();

    assert_eq!(processed.dropped, 0);
    assert_eq!(processed.records.len(), 1);
    assert_eq!(
        Value::Object(processed.records[0].clone()),
        json!({"date": "2024-01-01", "install_devices": 42})
    );
}

#[test]
fn test_empty_receive_datetime_yields_no_records() {
    let stream = find_stream("events").unwrap();
    let body = b"id,event_receive_datetime\n1,\n";

    let processed = stream.parse(body).unwrap();

    assert!(processed.records.is_empty());
    assert_eq!(processed.dropped, 1);
}

#[test]
fn test_output_is_input_rows_with_valid_cursor() {
    let stream = find_stream("events").unwrap();
    let body = b"event_name,event_receive_datetime\n\
                 open,2024-01-01 10:00:00\n\
                 broken,not-a-date\n\
                 close,2024-01-02 00:00:01\n\
                 empty,\n";

    let processed = stream.parse(body).unwrap();

    let names: Vec<&str> = processed
        .records
        .iter()
        .map(|r| r["event_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["open", "close"]);
    assert_eq!(processed.records[1]["event_receive_date"], json!("2024-01-02"));
    assert_eq!(processed.dropped, 2);
}

#[test]
fn test_rows_of_empty_fields_are_counted_as_dropped() {
    let stream = find_stream("events").unwrap();
    let body = b"event_name,event_receive_datetime\n,\nopen,2024-01-01 10:00:00\n";

    let processed = stream.parse(body).unwrap();

    assert_eq!(processed.records.len(), 1);
    assert_eq!(processed.dropped, 1);
}

#[test]
fn test_unparseable_body_is_an_error() {
    let stream = find_stream("install_devices").unwrap();
    assert!(stream.parse(b"<html>oops</html>").is_err());
}

// ============================================================================
// Schema Tests
// ============================================================================

#[test]
fn test_catalog_entry_schema() {
    let entry = find_stream("install_devices").unwrap().catalog_entry();

    assert_eq!(entry["name"], json!("install_devices"));
    assert_eq!(entry["supported_sync_modes"], json!(["incremental"]));
    assert_eq!(entry["default_cursor_field"], json!(["date"]));
    assert_eq!(
        entry["json_schema"]["properties"]["date"],
        json!({"type": "string", "format": "date"})
    );
    assert_eq!(
        entry["json_schema"]["properties"]["install_devices"],
        json!({"type": ["integer", "null"]})
    );
    assert_eq!(entry["json_schema"]["required"], json!(["date"]));
}

#[test]
fn test_events_schema_covers_requested_fields() {
    let stream = find_stream("events").unwrap();
    let Endpoint::LogsExport { fields, .. } = &stream.endpoint else {
        panic!("events should use the logs export");
    };
    for field in fields {
        assert!(stream.schema.field(field).is_some(), "missing schema field {field}");
    }
}
