//! Built-in AppMetrica streams

use super::definition::{Endpoint, StrategyKind, StreamDefinition, WindowStep};
use super::schema::{Field, JsonType, StreamSchema};
use super::transform::RowTransform;
use crate::decode::DecoderConfig;
use crate::error::{Error, Result};
use crate::types::CursorGranularity;
use once_cell::sync::Lazy;

const EVENT_FIELDS: &[&str] = &[
    "event_datetime",
    "event_json",
    "event_name",
    "event_receive_datetime",
    "event_receive_timestamp",
    "event_timestamp",
    "session_id",
    "installation_id",
    "appmetrica_device_id",
    "city",
    "connection_type",
    "country_iso_code",
    "device_ipv6",
    "device_locale",
    "device_manufacturer",
    "device_model",
    "device_type",
    "google_aid",
    "ios_ifa",
    "ios_ifv",
    "mcc",
    "mnc",
    "operator_name",
    "original_device_model",
    "os_name",
    "os_version",
    "profile_id",
    "windows_aid",
    "app_build_number",
    "app_package_name",
    "app_version_name",
    "application_id",
];

const INSTALLATION_FIELDS: &[&str] = &[
    "application_id",
    "click_datetime",
    "click_id",
    "click_ipv6",
    "click_timestamp",
    "click_url_parameters",
    "click_user_agent",
    "profile_id",
    "publisher_id",
    "publisher_name",
    "tracker_name",
    "tracking_id",
    "install_datetime",
    "install_ipv6",
    "install_receive_datetime",
    "install_receive_timestamp",
    "install_timestamp",
    "is_reattribution",
    "is_reinstallation",
    "match_type",
    "appmetrica_device_id",
    "city",
    "connection_type",
    "country_iso_code",
    "device_locale",
    "device_manufacturer",
    "device_model",
    "device_type",
    "google_aid",
    "ios_ifa",
    "ios_ifv",
    "mcc",
    "mnc",
    "operator_name",
    "os_name",
    "os_version",
    "windows_aid",
    "app_package_name",
    "app_version_name",
];

static BUILTIN_STREAMS: Lazy<Vec<StreamDefinition>> =
    Lazy::new(|| vec![events(), installations(), install_devices()]);

/// Log export stream whose date cursor is derived from a receive datetime
fn logs_export(
    name: &str,
    fields: &[&str],
    receive_datetime: &str,
    cursor_field: &str,
    step: WindowStep,
) -> StreamDefinition {
    let mut schema_fields = vec![Field::string(cursor_field).with_format("date").required()];
    schema_fields.extend(fields.iter().map(|f| Field::string(*f)));

    StreamDefinition {
        name: name.to_string(),
        path: format!("/logs/v1/export/{name}.csv"),
        decoder: DecoderConfig::csv(),
        endpoint: Endpoint::LogsExport {
            date_dimension: "receive".to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        },
        schema: StreamSchema::new(schema_fields),
        cursor_field: cursor_field.to_string(),
        granularity: CursorGranularity::DateTime,
        strategy: StrategyKind::Chunked(step),
        transform: RowTransform::derive_date(receive_datetime, cursor_field),
    }
}

fn events() -> StreamDefinition {
    logs_export(
        "events",
        EVENT_FIELDS,
        "event_receive_datetime",
        "event_receive_date",
        WindowStep::ChunkDays,
    )
}

fn installations() -> StreamDefinition {
    let mut stream = logs_export(
        "installations",
        INSTALLATION_FIELDS,
        "install_receive_datetime",
        "install_receive_date",
        WindowStep::Days(1),
    );
    stream.granularity = CursorGranularity::Date;
    stream
}

fn install_devices() -> StreamDefinition {
    StreamDefinition {
        name: "install_devices".to_string(),
        path: "/stat/v1/data".to_string(),
        decoder: DecoderConfig::json_with_path("data"),
        endpoint: Endpoint::StatData {
            metric: "ym:i:devices".to_string(),
            dimension: "ym:i:date".to_string(),
        },
        schema: StreamSchema::new(vec![
            Field::string("date").with_format("date").required(),
            Field::typed("install_devices", JsonType::Integer),
        ]),
        cursor_field: "date".to_string(),
        granularity: CursorGranularity::Date,
        strategy: StrategyKind::SingleRange,
        transform: RowTransform::dimension_metric("date", "install_devices"),
    }
}

/// All built-in streams
pub fn builtin_streams() -> &'static [StreamDefinition] {
    &BUILTIN_STREAMS
}

/// Look up a stream by name
pub fn find_stream(name: &str) -> Result<&'static StreamDefinition> {
    builtin_streams()
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::StreamNotFound {
            stream: name.to_string(),
        })
}

/// Resolve requested names, or every stream when none are given
pub fn select_streams(names: Option<&[String]>) -> Result<Vec<&'static StreamDefinition>> {
    let Some(names) = names.filter(|n| !n.is_empty()) else {
        return Ok(builtin_streams().iter().collect());
    };

    let mut selected: Vec<&'static StreamDefinition> = Vec::with_capacity(names.len());
    for name in names {
        let stream = find_stream(name)?;
        if !selected.iter().any(|s| s.name == stream.name) {
            selected.push(stream);
        }
    }
    Ok(selected)
}
