//! Decoding a response body while it downloads
//!
//! The body is bridged into a blocking reader and decoded on the blocking
//! pool. Rows come back through a bounded channel, so at most `ROW_BUFFER`
//! decoded rows and one read buffer are held at a time.

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use crate::types::JsonObject;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::io::{StreamReader, SyncIoBridge};

/// Response body as a stream of chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Rows decoded ahead of the consumer
const ROW_BUFFER: usize = 256;

/// Rows decoded from a streaming body
pub struct RowStream {
    rows: mpsc::Receiver<JsonObject>,
    task: Option<JoinHandle<Result<()>>>,
}

impl RowStream {
    /// Start decoding `body`. Must be called inside a tokio runtime.
    pub fn spawn(decoder: Box<dyn RecordDecoder>, body: ByteStream) -> Self {
        let (tx, rows) = mpsc::channel(ROW_BUFFER);
        let mut reader = SyncIoBridge::new(StreamReader::new(body));

        let task = tokio::task::spawn_blocking(move || {
            decoder.decode_each(&mut reader, &mut |row| {
                tx.blocking_send(row)
                    .map_err(|_| Error::decode("row consumer went away"))
            })
        });

        Self {
            rows,
            task: Some(task),
        }
    }

    /// Next row, or `None` once the whole body decoded cleanly.
    ///
    /// A decode or transfer error surfaces after the rows parsed before it.
    pub async fn next_row(&mut self) -> Result<Option<JsonObject>> {
        if let Some(row) = self.rows.recv().await {
            return Ok(Some(row));
        }

        match self.task.take() {
            Some(task) => {
                task.await
                    .map_err(|e| Error::decode(format!("decoder task failed: {e}")))??;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("finished", &self.task.is_none())
            .finish()
    }
}
