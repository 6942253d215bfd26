//! # Dispatcher
//!
//! Per-application log dispatch and batching.
//!
//! Responsibilities:
//! - Route each `LogEntry` to its application's `AppPipeline`
//! - Publish every entry to the application's live topic (best effort)
//! - Batch entries into bulk inserts on a size-or-idle trigger
//! - Isolate storage failures per application and aggregate them on shutdown

pub mod batcher;
pub mod dispatcher;
pub mod error;
mod handoff;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod stores;
#[cfg(test)]
mod testing;

pub use contracts::{LogCollection, LogEntry, LogStore, PubSub};
pub use batcher::BatchWriter;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use notifier::Notifier;
pub use pipeline::AppPipeline;
pub use stores::{FileCollection, FileStore, MemoryCollection, MemoryStore};
