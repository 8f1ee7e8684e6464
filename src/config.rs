//! Tap configuration
//!
//! The config is read from a JSON or YAML file (picked by extension) or from an
//! inline JSON string, then validated before any HTTP call is made.

use crate::auth::AuthConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::parse_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Public AppMetrica API host
pub const DEFAULT_BASE_URL: &str = "https://api.appmetrica.yandex.ru";

/// Upper bound for `chunk_days` and `lookback_days`
pub const MAX_DAYS: i64 = 36_500;

// ============================================================================
// TapConfig
// ============================================================================

/// Validated runtime configuration
#[derive(Clone, Deserialize)]
pub struct TapConfig {
    /// Application the data is exported for
    #[serde(default)]
    pub application_id: String,

    /// OAuth token
    #[serde(default)]
    pub token: String,

    /// Earliest record date to sync
    #[serde(default, deserialize_with = "deserialize_start_date")]
    pub start_date: Option<DateTime<Utc>>,

    /// Row limit forwarded to the API
    #[serde(default, deserialize_with = "deserialize_limit")]
    pub limit: Option<String>,

    /// Width of one events window, in days
    #[serde(default = "default_chunk_days")]
    pub chunk_days: i64,

    /// How far back to start when neither state nor `start_date` is set
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Constant wait between attempts
    #[serde(default = "default_retry_wait_seconds")]
    pub retry_wait_seconds: u64,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Client-side request rate, unlimited when unset
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// API host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Restrict the run to these streams
    #[serde(default)]
    pub streams: Option<Vec<String>>,
}

fn default_chunk_days() -> i64 {
    10
}

fn default_lookback_days() -> i64 {
    7
}

fn default_max_attempts() -> u32 {
    30
}

fn default_retry_wait_seconds() -> u64 {
    120
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            token: String::new(),
            start_date: None,
            limit: None,
            chunk_days: default_chunk_days(),
            lookback_days: default_lookback_days(),
            max_attempts: default_max_attempts(),
            retry_wait_seconds: default_retry_wait_seconds(),
            timeout_seconds: default_timeout_seconds(),
            requests_per_second: None,
            base_url: default_base_url(),
            user_agent: None,
            streams: None,
        }
    }
}

impl std::fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapConfig")
            .field("application_id", &self.application_id)
            .field("token", &"***")
            .field("start_date", &self.start_date)
            .field("limit", &self.limit)
            .field("chunk_days", &self.chunk_days)
            .field("lookback_days", &self.lookback_days)
            .field("max_attempts", &self.max_attempts)
            .field("retry_wait_seconds", &self.retry_wait_seconds)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("requests_per_second", &self.requests_per_second)
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("streams", &self.streams)
            .finish()
    }
}

impl TapConfig {
    /// Load and validate a config file.
    ///
    /// `.yaml` and `.yml` files are read as YAML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
            });

        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse and validate an inline JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config already held as JSON
    pub fn from_value(value: Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate against the current time
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now())
    }

    /// Validate against a fixed time
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(Error::missing_field("application_id"));
        }
        if self.token.trim().is_empty() {
            return Err(Error::missing_field("token"));
        }
        check_days("chunk_days", self.chunk_days)?;
        check_days("lookback_days", self.lookback_days)?;
        if self.max_attempts == 0 {
            return Err(Error::invalid_value(
                "max_attempts",
                "must be greater than 0",
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::invalid_value(
                "timeout_seconds",
                "must be greater than 0",
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be greater than 0",
            ));
        }

        let url = url::Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if let Some(start) = self.start_date {
            if start > now {
                return Err(Error::invalid_value(
                    "start_date",
                    format!("{start} is in the future"),
                ));
            }
        }

        if let Some(streams) = &self.streams {
            if streams.is_empty() {
                return Err(Error::invalid_value("streams", "must not be empty"));
            }
        }

        Ok(())
    }

    /// Width of one events window
    pub fn chunk_width(&self) -> Result<Duration> {
        Duration::try_days(self.chunk_days)
            .ok_or_else(|| Error::invalid_value("chunk_days", "out of range"))
    }

    /// Start used when there is no prior cursor and no `start_date`
    pub fn default_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        Duration::try_days(self.lookback_days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .ok_or_else(|| Error::invalid_value("lookback_days", "out of range"))
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.base_url.clone())
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .retries(
                self.max_attempts,
                std::time::Duration::from_secs(self.retry_wait_seconds),
            );

        if let Some(rps) = self.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build()
    }

    /// Authentication for every request
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::oauth(self.token.clone())
    }
}

fn check_days(field: &str, days: i64) -> Result<()> {
    if (1..=MAX_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(Error::invalid_value(
            field,
            format!("must be between 1 and {MAX_DAYS}, got {days}"),
        ))
    }
}

// ============================================================================
// Deserializers
// ============================================================================

fn deserialize_start_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_datetime(value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid start_date '{value}'"))
        }),
    }
}

/// Accepts `"100"`, `100` or null
fn deserialize_limit<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Limit {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Limit>::deserialize(deserializer)? {
        Some(Limit::Number(n)) => Some(n.to_string()),
        Some(Limit::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

// ============================================================================
// Config Spec
// ============================================================================

/// JSON schema of the config, printed by the `spec` command
pub fn config_spec() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "tap-appmetrica",
        "type": "object",
        "required": ["application_id", "token"],
        "properties": {
            "application_id": {
                "type": "string",
                "description": "AppMetrica application id"
            },
            "token": {
                "type": "string",
                "secret": true,
                "description": "OAuth token used to authenticate against the API"
            },
            "start_date": {
                "type": "string",
                "format": "date-time",
                "description": "Earliest record date to sync"
            },
            "limit": {
                "type": ["string", "integer"],
                "description": "Row limit forwarded to the export API"
            },
            "chunk_days": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_DAYS,
                "default": default_chunk_days(),
                "description": "Days covered by one events request"
            },
            "lookback_days": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_DAYS,
                "default": default_lookback_days()
            },
            "max_attempts": {
                "type": "integer",
                "minimum": 1,
                "default": default_max_attempts()
            },
            "retry_wait_seconds": {
                "type": "integer",
                "minimum": 0,
                "default": default_retry_wait_seconds()
            },
            "timeout_seconds": {
                "type": "integer",
                "minimum": 1,
                "default": default_timeout_seconds()
            },
            "requests_per_second": {
                "type": "integer",
                "minimum": 1
            },
            "base_url": {
                "type": "string",
                "format": "uri",
                "default": DEFAULT_BASE_URL
            },
            "user_agent": { "type": "string" },
            "streams": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Streams to sync, all when omitted"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use test_case::test_case;

    fn minimal() -> Value {
        json!({"application_id": "12345", "token": "secret-token"})
    }

    #[test]
    fn test_defaults_applied() {
        let config = TapConfig::from_value(minimal()).unwrap();
        assert_eq!(config.chunk_days, 10);
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.retry_wait_seconds, 120);
        assert_eq!(config.timeout_seconds, 300);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.requests_per_second.is_none());
        assert!(config.start_date.is_none());
        assert!(config.limit.is_none());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = TapConfig::from_value(json!({"token": "t"})).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "application_id"));

        let err = TapConfig::from_value(json!({"application_id": "1", "token": " "})).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "token"));
    }

    #[test_case("chunk_days", 0 ; "chunk days zero")]
    #[test_case("chunk_days", -1 ; "chunk days negative")]
    #[test_case("chunk_days", i64::MAX ; "chunk days huge")]
    #[test_case("lookback_days", 0 ; "lookback days zero")]
    #[test_case("lookback_days", MAX_DAYS + 1 ; "lookback days above bound")]
    #[test_case("lookback_days", i64::MAX ; "lookback days huge")]
    fn test_day_counts_out_of_range_rejected(name: &str, days: i64) {
        let mut value = minimal();
        value[name] = json!(days);
        let err = TapConfig::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == name));
    }

    #[test]
    fn test_day_counts_at_bound_are_usable() {
        let mut value = minimal();
        value["chunk_days"] = json!(MAX_DAYS);
        value["lookback_days"] = json!(MAX_DAYS);
        let config = TapConfig::from_value(value).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(config.chunk_width().unwrap(), Duration::days(MAX_DAYS));
        assert_eq!(
            config.default_start(now).unwrap(),
            now - Duration::days(MAX_DAYS)
        );
    }

    #[test]
    fn test_unvalidated_day_counts_error_instead_of_panicking() {
        let config = TapConfig {
            chunk_days: i64::MAX,
            lookback_days: i64::MAX,
            ..TapConfig::default()
        };
        assert!(config.chunk_width().is_err());
        assert!(config.default_start(Utc::now()).is_err());
    }

    #[test]
    fn test_limit_string_or_number() {
        let mut value = minimal();
        value["limit"] = json!(100);
        assert_eq!(TapConfig::from_value(value).unwrap().limit.as_deref(), Some("100"));

        let mut value = minimal();
        value["limit"] = json!("250");
        assert_eq!(TapConfig::from_value(value).unwrap().limit.as_deref(), Some("250"));

        let mut value = minimal();
        value["limit"] = Value::Null;
        assert!(TapConfig::from_value(value).unwrap().limit.is_none());
    }

    #[test]
    fn test_start_date_shapes() {
        let mut value = minimal();
        value["start_date"] = json!("2024-01-01");
        let config = TapConfig::from_value(value).unwrap();
        assert_eq!(
            config.start_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );

        let mut value = minimal();
        value["start_date"] = json!("2024-01-01T12:30:00+03:00");
        let config = TapConfig::from_value(value).unwrap();
        assert_eq!(
            config.start_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap())
        );

        let mut value = minimal();
        value["start_date"] = json!("yesterday");
        assert!(TapConfig::from_value(value).is_err());
    }

    #[test]
    fn test_start_date_in_future_rejected() {
        let mut config = TapConfig::from_value(minimal()).unwrap();
        config.start_date = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let err = config.validate_at(now).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "start_date"));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut value = minimal();
        value["base_url"] = json!("not a url");
        assert!(matches!(
            TapConfig::from_value(value).unwrap_err(),
            Error::InvalidUrl(_)
        ));

        let mut value = minimal();
        value["base_url"] = json!("ftp://example.com");
        assert!(TapConfig::from_value(value).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = TapConfig::from_value(minimal()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_load_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("config.yaml");
        let mut file = fs::File::create(&yaml_path).unwrap();
        writeln!(file, "application_id: \"42\"\ntoken: abc\nchunk_days: 3").unwrap();
        let config = TapConfig::load(&yaml_path).unwrap();
        assert_eq!(config.application_id, "42");
        assert_eq!(config.chunk_days, 3);

        let json_path = dir.path().join("config.json");
        fs::write(&json_path, minimal().to_string()).unwrap();
        assert_eq!(TapConfig::load(&json_path).unwrap().application_id, "12345");

        assert!(TapConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_http_client_config_from_tap_config() {
        let mut value = minimal();
        value["max_attempts"] = json!(4);
        value["retry_wait_seconds"] = json!(2);
        value["requests_per_second"] = json!(5);
        value["user_agent"] = json!("custom/1.0");
        let config = TapConfig::from_value(value).unwrap();

        let http = config.http_client_config();
        assert_eq!(http.base_url.as_deref(), Some(DEFAULT_BASE_URL));
        assert_eq!(http.max_attempts, 4);
        assert_eq!(http.retry_wait, std::time::Duration::from_secs(2));
        assert_eq!(http.rate_limit, Some(RateLimiterConfig::per_second(5)));
        assert_eq!(http.user_agent, "custom/1.0");
    }

    #[test]
    fn test_config_spec_lists_required_fields() {
        let spec = config_spec();
        assert_eq!(spec["required"], json!(["application_id", "token"]));
        assert_eq!(spec["properties"]["chunk_days"]["default"], json!(10));
        assert_eq!(spec["properties"]["token"]["secret"], json!(true));
    }
}
