//! Per-stream window reader
//!
//! Walks a stream's windows in order, one request at a time. Records are
//! yielded while the body downloads; the cursor only advances once a window's
//! body has been read and decoded to the end.

use super::types::{CompletedWindow, ReadEvent};
use crate::config::TapConfig;
use crate::decode::{build_decoder, ByteStream, RowStream};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pagination::{Window, WindowStrategy};
use crate::streams::{RequestParams, StreamDefinition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use tracing::{debug, info};

/// Source of raw response bodies
#[async_trait]
pub trait WindowFetcher: Send + Sync {
    /// Start the request for one window and return its body stream
    async fn fetch(&self, params: &RequestParams) -> Result<ByteStream>;
}

#[async_trait]
impl WindowFetcher for HttpClient {
    async fn fetch(&self, params: &RequestParams) -> Result<ByteStream> {
        self.get_stream(&params.path, params.to_request_config())
            .await
    }
}

/// The window whose body is being decoded
#[derive(Debug)]
struct OpenWindow {
    window: Window,
    rows: RowStream,
    records: usize,
    dropped: usize,
}

/// Iterates one stream's windows from its resume point up to `now`
pub struct StreamReader<'a> {
    stream: &'a StreamDefinition,
    config: &'a TapConfig,
    fetcher: &'a dyn WindowFetcher,
    strategy: Box<dyn WindowStrategy>,
    cursor: DateTime<Utc>,
    now: DateTime<Utc>,
    open: Option<OpenWindow>,
}

impl<'a> StreamReader<'a> {
    /// Resolve the starting cursor and window strategy.
    ///
    /// The start is the prior cursor if any, else `start_date`, else
    /// `now - lookback_days`. Start and `now` are both truncated to the
    /// stream's cursor granularity.
    pub fn new(
        stream: &'a StreamDefinition,
        config: &'a TapConfig,
        fetcher: &'a dyn WindowFetcher,
        prior_cursor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let granularity = stream.granularity;
        let start = match prior_cursor {
            Some(raw) => granularity.parse_cursor(raw).ok_or_else(|| {
                Error::state(format!(
                    "Invalid cursor '{raw}' for stream '{}'",
                    stream.name
                ))
            })?,
            None => match config.start_date {
                Some(start_date) => start_date,
                None => config.default_start(now)?,
            },
        };

        Ok(Self {
            stream,
            config,
            fetcher,
            strategy: stream.build_strategy(config)?,
            cursor: granularity.truncate(start),
            now: granularity.truncate(now),
            open: None,
        })
    }

    /// Start of the next window
    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }

    /// Upper bound of the run
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Next record or window completion, or `None` when caught up
    pub async fn next_event(&mut self) -> Result<Option<ReadEvent>> {
        loop {
            let Some(open) = self.open.as_mut() else {
                let Some(window) = self.strategy.next_window(self.cursor, self.now) else {
                    debug!("Stream '{}' is caught up at {}", self.stream.name, self.cursor);
                    return Ok(None);
                };

                info!(
                    "Stream '{}': fetching window {} ({})",
                    self.stream.name,
                    window,
                    self.strategy.name()
                );

                let rows = self
                    .open_window(&window)
                    .await
                    .map_err(|e| window_error(self.stream, &window, e))?;
                self.open = Some(OpenWindow {
                    window,
                    rows,
                    records: 0,
                    dropped: 0,
                });
                continue;
            };

            let window = open.window;
            match open.rows.next_row().await {
                Ok(Some(row)) => match self.stream.process_row(row) {
                    Some(record) => {
                        open.records += 1;
                        return Ok(Some(ReadEvent::Record(record)));
                    }
                    None => open.dropped += 1,
                },
                Ok(None) => {
                    let (records, dropped) = (open.records, open.dropped);
                    self.open = None;
                    return Ok(Some(ReadEvent::WindowDone(self.complete(window, records, dropped))));
                }
                Err(e) => {
                    self.open = None;
                    return Err(window_error(self.stream, &window, e));
                }
            }
        }
    }

    async fn open_window(&self, window: &Window) -> Result<RowStream> {
        let params = self.stream.request_params(self.config, window);
        let body = self.fetcher.fetch(&params).await?;
        Ok(RowStream::spawn(build_decoder(&self.stream.decoder), body))
    }

    fn complete(&mut self, window: Window, records: usize, dropped: usize) -> CompletedWindow {
        debug!(
            "Stream '{}': window {} gave {} records, {} dropped",
            self.stream.name, window, records, dropped
        );

        self.cursor = self.strategy.next_cursor(&window);
        CompletedWindow {
            stream: self.stream.name.clone(),
            window,
            records,
            rows_dropped: dropped,
            cursor: self.stream.granularity.format_cursor(self.cursor),
        }
    }

    /// Turn the reader into a stream of read events
    pub fn into_stream(self) -> impl Stream<Item = Result<ReadEvent>> + 'a {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok(reader
                .next_event()
                .await?
                .map(|event| (event, reader)))
        })
    }
}

fn window_error(stream: &StreamDefinition, window: &Window, e: Error) -> Error {
    Error::window(
        &stream.name,
        window.since.to_rfc3339(),
        window.until.to_rfc3339(),
        e,
    )
}
