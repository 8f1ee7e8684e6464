//! Response decoder module
//!
//! Supports: CSV (logs exports) and JSON (reporting API)
//!
//! # Overview
//!
//! Each decoder turns a response body into flat row objects. Row filtering
//! and per-stream reshaping happen later, in the stream definitions.
//! [`RowStream`] decodes a body while it is still downloading.

mod decoders;
mod stream;
mod types;

pub use decoders::{CsvDecoder, JsonDecoder};
pub use stream::{ByteStream, RowStream};
pub use types::{build_decoder, DecoderConfig, DecoderFormat, RecordDecoder};
