//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{config_spec, TapConfig};
use crate::engine::{Message, MessageSink, SyncEngine};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::pagination::Window;
use crate::state::StateManager;
use crate::streams::{builtin_streams, find_stream, select_streams};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::io::Write;
use tracing::info;

/// Stream used by `check`
const CHECK_STREAM: &str = "events";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Spec => self.spec(),
            Commands::Check => self.check().await,
            Commands::Discover => self.discover(),
            Commands::Read { streams } => self.read(streams.as_deref()).await,
        }
    }

    /// Load configuration; inline JSON takes precedence over the file
    fn load_config(&self) -> Result<TapConfig> {
        if let Some(json_str) = &self.cli.config_json {
            return TapConfig::from_json_str(json_str);
        }

        match &self.cli.config {
            Some(path) => TapConfig::load(path),
            None => Err(Error::config(
                "No configuration given (use --config or --config-json)",
            )),
        }
    }

    /// Load state; inline JSON takes precedence over the file
    fn load_state(&self) -> Result<StateManager> {
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    fn build_client(config: &TapConfig) -> Result<HttpClient> {
        HttpClient::with_auth(config.http_client_config(), config.auth_config())
    }

    /// Show spec
    fn spec(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "SPEC",
            "spec": {
                "connectionSpecification": config_spec()
            }
        }))
    }

    /// Check connection with a one-day, one-row export request
    async fn check(&self) -> Result<()> {
        let mut config = self.load_config()?;
        config.limit = Some("1".to_string());
        let client = Self::build_client(&config)?;
        let stream = find_stream(CHECK_STREAM)?;

        let now = Utc::now();
        let window = Window::new(now - Duration::days(1), now);
        let params = stream.request_params(&config, &window);

        self.output_message(&Message::info(format!(
            "Checking connection to {}",
            config.base_url
        ))
        .to_json())?;

        let status = match client.check_once(&params.path, params.to_request_config()).await {
            Ok(status) => json!({
                "status": "SUCCEEDED",
                "message": format!("Connection successful (HTTP {})", status.as_u16())
            }),
            Err(e) => json!({
                "status": "FAILED",
                "message": format!("Connection failed: {e}")
            }),
        };

        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }))
    }

    /// Print the catalog of built-in streams
    fn discover(&self) -> Result<()> {
        let streams: Vec<Value> = builtin_streams()
            .iter()
            .map(|stream| stream.catalog_entry())
            .collect();

        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": {
                "streams": streams
            }
        }))
    }

    /// Read data
    async fn read(&self, streams: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let state = self.load_state()?;

        // --streams overrides the config's list
        let requested: Option<Vec<String>> = match streams {
            Some(list) => Some(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            ),
            None => config.streams.clone(),
        };
        let selected = select_streams(requested.as_deref())?;
        info!(
            "Syncing streams: {}",
            selected
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let client = Self::build_client(&config)?;
        let mut engine = SyncEngine::new(client, config, state);
        let mut sink = StdoutSink {
            format: self.cli.format,
        };

        let result = engine.sync(&selected, &mut sink).await;

        if let Err(e) = &result {
            sink.emit(&Message::error(e.to_string()))?;
        }

        // Final state, so callers can capture it even when nothing advanced
        sink.emit(&Message::state(engine.state().snapshot().await))?;

        let mut summary = engine.stats().summary();
        summary["summary"]["state_file"] = json!(self
            .cli
            .state
            .as_ref()
            .filter(|_| self.cli.state_json.is_none())
            .map(|p| p.to_string_lossy().to_string()));
        self.output_message(&summary)?;

        result
    }

    /// Output a message
    fn output_message(&self, msg: &Value) -> Result<()> {
        write_message(self.cli.format, msg)
    }
}

/// Writes every engine message to stdout
struct StdoutSink {
    format: OutputFormat,
}

impl MessageSink for StdoutSink {
    fn emit(&mut self, message: &Message) -> Result<()> {
        write_message(self.format, &message.to_json())
    }
}

fn write_message(format: OutputFormat, msg: &Value) -> Result<()> {
    let line = match format {
        OutputFormat::Json => serde_json::to_string(msg)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").context("Failed to write to stdout")?;
    Ok(())
}
