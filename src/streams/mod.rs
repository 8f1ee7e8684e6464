//! Stream definitions
//!
//! Each AppMetrica entity is pure configuration over the shared engine:
//! endpoint path, field list, cursor field, window strategy and a row
//! transform.
//!
//! | stream          | endpoint                            | strategy          |
//! |-----------------|-------------------------------------|-------------------|
//! | events          | /logs/v1/export/events.csv          | `chunk_days` wide |
//! | installations   | /logs/v1/export/installations.csv   | one day           |
//! | install_devices | /stat/v1/data                       | single range      |

mod catalog;
mod definition;
mod request;
mod schema;
mod transform;

pub use catalog::{builtin_streams, find_stream, select_streams};
pub use definition::{Endpoint, ProcessedRows, StrategyKind, StreamDefinition, WindowStep};
pub use request::RequestParams;
pub use schema::{Field, JsonType, StreamSchema};
pub use transform::RowTransform;

#[cfg(test)]
mod tests;
