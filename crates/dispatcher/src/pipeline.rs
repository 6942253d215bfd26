//! AppPipeline - one application's ingestion queue, writer task and batcher task

use std::sync::Arc;

use contracts::{LogEntry, LogStore, PubSub};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, instrument, warn};

use crate::batcher::BatchWriter;
use crate::dispatcher::DispatcherConfig;
use crate::error::DispatcherError;
use crate::handoff::{handoff, HandoffReceiver, HandoffSender};
use crate::metrics::PipelineMetrics;
use crate::notifier::Notifier;

type BatcherResult = Result<(), DispatcherError>;

/// Handle to a running application pipeline
///
/// Entries flow: ingestion queue -> writer task (notify, then hand off) ->
/// batcher task (buffer, bulk insert). The batcher's result is the
/// pipeline's completion status and is surfaced exactly once.
pub struct AppPipeline {
    app_name: String,
    /// `None` once the ingestion queue has been closed
    tx: Option<mpsc::Sender<LogEntry>>,
    metrics: Arc<PipelineMetrics>,
    writer: JoinHandle<()>,
    /// `None` once the batcher's status has been observed
    batcher: Option<JoinHandle<BatcherResult>>,
}

impl AppPipeline {
    /// Create the pipeline and spawn its writer and batcher tasks
    #[instrument(name = "app_pipeline_spawn", skip(store, pubsub, config))]
    pub fn spawn<S, P>(
        app_name: &str,
        store: Arc<S>,
        pubsub: Arc<P>,
        config: &DispatcherConfig,
    ) -> Self
    where
        S: LogStore + Sync + 'static,
        P: PubSub + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (handoff_tx, handoff_rx) = handoff();
        let metrics = Arc::new(PipelineMetrics::new());

        let notifier = Notifier::new(app_name, pubsub, Arc::clone(&metrics));
        let writer = tokio::spawn(run_writer(
            app_name.to_string(),
            rx,
            notifier,
            handoff_tx,
            Arc::clone(&metrics),
        ));
        let batcher = tokio::spawn(run_batcher(
            app_name.to_string(),
            store,
            handoff_rx,
            config.clone(),
            Arc::clone(&metrics),
        ));

        observability::record_pipeline_created(app_name);
        debug!(app = %app_name, "AppPipeline started");

        Self {
            app_name: app_name.to_string(),
            tx: Some(tx),
            metrics,
            writer,
            batcher: Some(batcher),
        }
    }

    /// Application name
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Enqueue an entry, waiting while the ingestion queue is full
    ///
    /// Returns the pipeline's stored failure instead of waiting once the
    /// batcher has terminated. After an error the pipeline must be retired.
    pub async fn send(&mut self, entry: LogEntry) -> Result<(), DispatcherError> {
        let (Some(tx), Some(batcher)) = (self.tx.as_ref(), self.batcher.as_mut()) else {
            return Err(DispatcherError::pipeline_closed(&self.app_name));
        };

        tokio::select! {
            biased;

            joined = batcher => {
                self.batcher = None;
                Err(failure(&self.app_name, joined))
            }
            sent = tx.send(entry) => match sent {
                Ok(()) => {
                    self.metrics.inc_received_count();
                    self.metrics.set_queue_len(self.queued());
                    observability::record_entry_received(&self.app_name);
                    Ok(())
                }
                // The writer only lets go of the queue after the batcher is gone
                Err(_) => Err(self.wait_failure().await),
            },
        }
    }

    /// Close the ingestion queue; already queued entries still drain
    pub fn close_queue(&mut self) {
        if self.tx.take().is_some() {
            debug!(app = %self.app_name, "Ingestion queue closed");
        }
    }

    /// Close the queue and wait for the batcher's final status
    ///
    /// `Ok(())` on clean shutdown; otherwise the last fatal persistence error,
    /// unless that error was already returned from `send`.
    #[instrument(name = "app_pipeline_stop", skip(self), fields(app = %self.app_name))]
    pub async fn stop(mut self) -> Result<(), DispatcherError> {
        self.close_queue();

        if let Err(e) = (&mut self.writer).await {
            error!(app = %self.app_name, error = ?e, "Writer task panicked");
        }

        let result = match self.batcher.take() {
            Some(batcher) => flatten(&self.app_name, batcher.await),
            None => Ok(()),
        };

        observability::record_pipeline_retired(&self.app_name, result.is_err());
        match &result {
            Ok(()) => debug!(app = %self.app_name, "AppPipeline stopped"),
            Err(e) => warn!(app = %self.app_name, error = %e, "AppPipeline stopped with error"),
        }
        result
    }

    /// Drop a pipeline whose failure has already been surfaced
    pub fn retire(mut self) {
        self.close_queue();
        observability::record_pipeline_retired(&self.app_name, true);
        info!(app = %self.app_name, "AppPipeline retired");
    }

    fn queued(&self) -> usize {
        self.tx
            .as_ref()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    async fn wait_failure(&mut self) -> DispatcherError {
        match self.batcher.take() {
            Some(batcher) => failure(&self.app_name, batcher.await),
            None => DispatcherError::pipeline_closed(&self.app_name),
        }
    }
}

fn flatten(app_name: &str, joined: Result<BatcherResult, JoinError>) -> BatcherResult {
    joined.map_err(|e| DispatcherError::task_failed(app_name, e.to_string()))?
}

/// Error to report for a batcher that has already finished
fn failure(app_name: &str, joined: Result<BatcherResult, JoinError>) -> DispatcherError {
    match flatten(app_name, joined) {
        Err(e) => e,
        Ok(()) => DispatcherError::pipeline_closed(app_name),
    }
}

/// Writer task: notify, then hand off, strictly in arrival order
#[instrument(name = "pipeline_writer_loop", skip_all, fields(app = %app_name))]
async fn run_writer<P: PubSub>(
    app_name: String,
    mut rx: mpsc::Receiver<LogEntry>,
    notifier: Notifier<P>,
    handoff: HandoffSender,
    metrics: Arc<PipelineMetrics>,
) {
    while let Some(entry) = rx.recv().await {
        metrics.set_queue_len(rx.len());
        observability::record_queue_depth(&app_name, rx.len());

        notifier.notify(&entry).await;

        if handoff.send(entry).await.is_err() {
            // Batcher is gone: refuse further sends and discard what is queued
            rx.close();
            let mut dropped = 1;
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
            metrics.add_dropped_count(dropped);
            metrics.set_queue_len(0);
            observability::record_entry_dropped(&app_name, dropped);
            warn!(app = %app_name, dropped, "Batcher stopped, discarding queued entries");
            return;
        }
    }

    debug!(app = %app_name, "Ingestion queue drained");
}

/// Batcher task: open the collection, then batch until the writer is done
#[instrument(name = "pipeline_batcher_loop", skip_all, fields(app = %app_name))]
async fn run_batcher<S: LogStore>(
    app_name: String,
    store: Arc<S>,
    input: HandoffReceiver,
    config: DispatcherConfig,
    metrics: Arc<PipelineMetrics>,
) -> BatcherResult {
    let collection = store.open(&app_name).await.map_err(|source| {
        error!(app = %app_name, error = %source, "Failed to open log storage");
        DispatcherError::StorageOpen {
            app_name: app_name.clone(),
            source,
        }
    })?;

    BatchWriter::new(collection, config.batch_size, config.flush_interval, metrics)
        .run(input)
        .await
}
