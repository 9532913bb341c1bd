//! Destination sinks.

mod bigquery;
mod traits;

pub use bigquery::BigQuerySink;
pub use traits::RowSink;
