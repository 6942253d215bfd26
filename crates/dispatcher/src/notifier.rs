//! Notifier - best-effort publish of entries to the live topic

use std::sync::Arc;

use contracts::{log_topic, LogEntry, PubSub};
use tracing::{error, trace};

use crate::metrics::PipelineMetrics;

/// Publishes each entry of one application to its live topic
///
/// Failures are logged and counted, never returned: the entry continues on
/// its persistence path regardless.
pub struct Notifier<P> {
    app_name: String,
    topic: String,
    pubsub: Arc<P>,
    metrics: Arc<PipelineMetrics>,
}

impl<P: PubSub> Notifier<P> {
    pub fn new(app_name: impl Into<String>, pubsub: Arc<P>, metrics: Arc<PipelineMetrics>) -> Self {
        let app_name = app_name.into();
        let topic = log_topic(&app_name);
        Self {
            app_name,
            topic,
            pubsub,
            metrics,
        }
    }

    /// Topic entries are published on
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish `entry`, swallowing any failure
    pub async fn notify(&self, entry: &LogEntry) {
        let payload = match entry.encode() {
            Ok(payload) => payload,
            Err(e) => {
                self.record_failure();
                error!(app = %self.app_name, error = %e, "Error on logs notify");
                return;
            }
        };

        match self.pubsub.publish(&self.topic, payload).await {
            Ok(()) => {
                self.metrics.inc_published_count();
                observability::record_entry_published(&self.app_name);
                trace!(app = %self.app_name, topic = %self.topic, "Entry published");
            }
            Err(e) => {
                self.record_failure();
                error!(app = %self.app_name, topic = %self.topic, error = %e, "Error on logs notify");
            }
        }
    }

    fn record_failure(&self) {
        self.metrics.inc_publish_failure_count();
        observability::record_publish_failure(&self.app_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPubSub;

    #[tokio::test]
    async fn test_notify_publishes_encoded_entry() {
        let pubsub = Arc::new(RecordingPubSub::default());
        let metrics = Arc::new(PipelineMetrics::new());
        let notifier = Notifier::new("web", Arc::clone(&pubsub), Arc::clone(&metrics));

        let entry = LogEntry::new("web", "app", "u1", "hello");
        notifier.notify(&entry).await;

        let published = pubsub.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "pubsub:web");
        assert_eq!(LogEntry::decode(&published[0].1).unwrap(), entry);
        assert_eq!(metrics.published_count(), 1);
    }

    #[tokio::test]
    async fn test_notify_swallows_failure() {
        let metrics = Arc::new(PipelineMetrics::new());
        let notifier = Notifier::new("web", Arc::new(RecordingPubSub::failing()), Arc::clone(&metrics));

        notifier.notify(&LogEntry::new("web", "app", "u1", "hello")).await;

        assert_eq!(metrics.publish_failure_count(), 1);
        assert_eq!(metrics.published_count(), 0);
        assert_eq!(notifier.topic(), "pubsub:web");
    }
}
