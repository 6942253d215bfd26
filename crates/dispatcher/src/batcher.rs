//! BatchWriter - size-or-idle triggered bulk persistence

use std::sync::Arc;
use std::time::Duration;

use contracts::{LogCollection, LogEntry};
use tokio::time::{self, Instant};
use tracing::{debug, error, instrument, warn};

use crate::error::DispatcherError;
use crate::handoff::HandoffReceiver;
use crate::metrics::PipelineMetrics;

/// Buffers one application's entries and bulk-inserts them
///
/// A flush happens when the buffer reaches `batch_size`, when
/// `flush_interval` passes without a new entry, and once more when the
/// writer side finishes. The first failed insert ends the batcher.
pub struct BatchWriter<C> {
    collection: C,
    buffer: Vec<LogEntry>,
    batch_size: usize,
    flush_interval: Duration,
    metrics: Arc<PipelineMetrics>,
}

impl<C: LogCollection> BatchWriter<C> {
    pub fn new(
        collection: C,
        batch_size: usize,
        flush_interval: Duration,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            collection,
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            flush_interval,
            metrics,
        }
    }

    /// Accept entries until the hand-off closes, then flush and close
    ///
    /// Returns the first persistence error; the failed batch is not retried.
    #[instrument(
        name = "batch_writer_run",
        skip(self, input),
        fields(app = %self.collection.app_name())
    )]
    pub(crate) async fn run(mut self, input: HandoffReceiver) -> Result<(), DispatcherError> {
        let result = self.accept(input).await;

        if let Err(e) = self.collection.close().await {
            warn!(app = %self.collection.app_name(), error = %e, "Close failed on shutdown");
        }

        result
    }

    async fn accept(&mut self, mut input: HandoffReceiver) -> Result<(), DispatcherError> {
        let idle = time::sleep(self.flush_interval);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                received = input.recv() => match received {
                    Some(entry) => {
                        self.buffer.push(entry);
                        if self.buffer.len() >= self.batch_size {
                            self.flush().await?;
                        }
                        idle.as_mut().reset(Instant::now() + self.flush_interval);
                    }
                    None => break,
                },
                () = &mut idle, if !self.buffer.is_empty() => {
                    self.flush().await?;
                }
            }
        }

        debug!(
            app = %self.collection.app_name(),
            pending = self.buffer.len(),
            "Writer done, final flush"
        );
        self.flush().await
    }

    async fn flush(&mut self) -> Result<(), DispatcherError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        match self.collection.bulk_insert(&self.buffer).await {
            Ok(()) => {
                let size = self.buffer.len();
                self.metrics.record_batch(size);
                observability::record_batch_flushed(
                    self.collection.app_name(),
                    size,
                    started.elapsed(),
                );
                debug!(app = %self.collection.app_name(), count = size, "Batch flushed");
                self.buffer.clear();
                Ok(())
            }
            Err(source) => {
                let count = self.buffer.len();
                observability::record_persist_failure(self.collection.app_name(), count);
                error!(
                    app = %self.collection.app_name(),
                    count,
                    error = %source,
                    "Bulk insert failed"
                );
                Err(DispatcherError::Persist {
                    app_name: self.collection.app_name().to_string(),
                    count,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::handoff;
    use crate::stores::MemoryStore;
    use crate::testing::{entries, ScriptedStore};
    use contracts::LogStore;

    const IDLE: Duration = Duration::from_millis(500);

    async fn spawn_writer(
        store: &MemoryStore,
        batch_size: usize,
    ) -> (
        crate::handoff::HandoffSender,
        tokio::task::JoinHandle<Result<(), DispatcherError>>,
    ) {
        let collection = store.open("web").await.unwrap();
        let writer = BatchWriter::new(collection, batch_size, IDLE, Arc::new(PipelineMetrics::new()));
        let (tx, rx) = handoff();
        (tx, tokio::spawn(writer.run(rx)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buffer_flushes_without_waiting() {
        let store = MemoryStore::new();
        let (tx, handle) = spawn_writer(&store, 100).await;

        for entry in entries("web", 100) {
            tx.send(entry).await.unwrap();
        }
        // Let the batcher finish the insert; well below the idle timer
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(store.batches("web").len(), 1);
        assert_eq!(store.batches("web")[0].len(), 100);

        drop(tx);
        handle.await.unwrap().unwrap();
        assert_eq!(store.batches("web").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timer_flushes_partial_batch() {
        let store = MemoryStore::new();
        let (tx, handle) = spawn_writer(&store, 100).await;

        tx.send(LogEntry::new("web", "app", "u1", "only")).await.unwrap();

        time::sleep(IDLE - Duration::from_millis(10)).await;
        assert!(store.batches("web").is_empty());

        time::sleep(Duration::from_millis(20)).await;
        let batches = store.batches("web");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);

        // Idle timer never fires on an empty buffer
        time::sleep(IDLE * 4).await;
        assert_eq!(store.batches("web").len(), 1);

        drop(tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_entry_resets_idle_timer() {
        let store = MemoryStore::new();
        let (tx, handle) = spawn_writer(&store, 100).await;

        for entry in entries("web", 5) {
            tx.send(entry).await.unwrap();
            time::sleep(IDLE / 2).await;
        }
        assert!(store.batches("web").is_empty());

        time::sleep(IDLE).await;
        assert_eq!(store.batches("web").len(), 1);
        assert_eq!(store.batches("web")[0].len(), 5);

        drop(tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_flushes_remaining_in_order() {
        let store = MemoryStore::new();
        let (tx, handle) = spawn_writer(&store, 3).await;

        for entry in entries("web", 7) {
            tx.send(entry).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap().unwrap();

        let sizes: Vec<usize> = store.batches("web").iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let messages: Vec<String> = store.entries("web").into_iter().map(|e| e.message).collect();
        let expected: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        assert_eq!(messages, expected);
    }

    #[tokio::test]
    async fn test_insert_failure_ends_batcher() {
        let store = ScriptedStore::default();
        store.set_failing("web", true);
        let collection = store.open("web").await.unwrap();
        let metrics = Arc::new(PipelineMetrics::new());
        let writer = BatchWriter::new(collection, 2, IDLE, Arc::clone(&metrics));
        let (tx, rx) = handoff();
        let handle = tokio::spawn(writer.run(rx));

        for entry in entries("web", 2) {
            tx.send(entry).await.unwrap();
        }

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, DispatcherError::Persist { count: 2, .. }));
        assert_eq!(metrics.batch_count(), 0);

        // The hand-off is closed once the batcher is gone
        assert!(tx.send(LogEntry::default()).await.is_err());
    }
}
