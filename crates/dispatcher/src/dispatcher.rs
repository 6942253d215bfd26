//! Dispatcher - routes entries to per-application pipelines

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{LogEntry, LogStore, PipelineConfig, PubSub};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::AppPipeline;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Capacity of each application's ingestion queue
    pub queue_capacity: usize,
    /// Entries per bulk insert
    pub batch_size: usize,
    /// Idle time after the last entry before a partial batch is flushed
    pub flush_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 100,
            flush_interval: Duration::from_millis(500),
        }
    }
}

impl From<&PipelineConfig> for DispatcherConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            batch_size: config.batch_size,
            flush_interval: Duration::from_millis(config.flush_interval_ms),
        }
    }
}

/// Routes entries to one `AppPipeline` per application name
///
/// Pipelines are created lazily on the first entry for an application.
/// A pipeline that reports a failure is removed, so the next entry for that
/// application starts a fresh one. Single writer: every method takes
/// `&mut self`.
pub struct Dispatcher<S, P> {
    store: Arc<S>,
    pubsub: Arc<P>,
    config: DispatcherConfig,
    pipelines: HashMap<String, AppPipeline>,
}

impl<S, P> Dispatcher<S, P>
where
    S: LogStore + Sync + 'static,
    P: PubSub + Sync + 'static,
{
    pub fn new(store: Arc<S>, pubsub: Arc<P>, config: DispatcherConfig) -> Self {
        Self {
            store,
            pubsub,
            config,
            pipelines: HashMap::new(),
        }
    }

    /// Number of live pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn has_pipeline(&self, app_name: &str) -> bool {
        self.pipelines.contains_key(app_name)
    }

    /// Get metrics for all live pipelines
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut snapshots: Vec<_> = self
            .pipelines
            .iter()
            .map(|(name, p)| (name.clone(), p.metrics().snapshot()))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }

    /// Route an entry to its application's pipeline
    ///
    /// Blocks while that pipeline's queue is full. An error means the
    /// pipeline failed earlier (or fails now); it has been dropped and the
    /// entry was not accepted.
    pub async fn send(&mut self, entry: LogEntry) -> Result<(), DispatcherError> {
        let app_name = entry.app_name.clone();

        let pipeline = match self.pipelines.entry(app_name.clone()) {
            std::collections::hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
            std::collections::hash_map::Entry::Vacant(vacant) => {
                info!(app = %app_name, "Creating log pipeline");
                vacant.insert(AppPipeline::spawn(
                    &app_name,
                    Arc::clone(&self.store),
                    Arc::clone(&self.pubsub),
                    &self.config,
                ))
            }
        };

        match pipeline.send(entry).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(app = %app_name, error = %e, "Log pipeline failed, removing it");
                if let Some(failed) = self.pipelines.remove(&app_name) {
                    failed.retire();
                }
                Err(e)
            }
        }
    }

    /// Stop every pipeline and wait for them to finish
    ///
    /// All queues are closed first so pipelines drain concurrently. Returns
    /// the failures not yet reported by `send`, combined into one error.
    /// The dispatcher is empty afterwards and may be used again.
    #[instrument(name = "dispatcher_stop", skip(self), fields(pipelines = self.pipelines.len()))]
    pub async fn stop(&mut self) -> Result<(), DispatcherError> {
        let mut pipelines: Vec<AppPipeline> = self.pipelines.drain().map(|(_, p)| p).collect();
        pipelines.sort_by(|a, b| a.app_name().cmp(b.app_name()));

        for pipeline in &mut pipelines {
            pipeline.close_queue();
        }

        let mut errors = Vec::new();
        for pipeline in pipelines {
            if let Err(e) = pipeline.stop().await {
                errors.push(e);
            }
        }

        debug!(failed = errors.len(), "Dispatcher stopped");
        DispatcherError::combine(errors)
    }
}
