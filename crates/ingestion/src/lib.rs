//! # Ingestion
//!
//! Line-oriented log ingestion endpoint.
//!
//! One connection carries newline-delimited JSON `LogEntry` values. Every
//! connection runs its own `Dispatcher`; when the stream ends the dispatcher
//! is stopped and a single JSON status frame is written back.

pub mod endpoint;
pub mod error;

pub use endpoint::{Identity, IngestOutcome, IngestionEndpoint, StatusFrame, MAX_LINE_BYTES};
pub use error::{IngestionError, Result};
