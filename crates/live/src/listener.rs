//! LiveListener - filtered, per-application tail of the live topic

use async_channel::{bounded, Receiver, Sender};
use contracts::{log_topic, ContractError, LogEntry, LogFilter, PubSub, TopicSubscription};
use tokio::sync::oneshot;
use tracing::{debug, error, instrument, warn};

use crate::error::LiveError;

/// Entries buffered between the forwarding task and the consumer
pub const DEFAULT_DELIVERY_CAPACITY: usize = 10;

type StopReply = oneshot::Sender<Result<(), ContractError>>;

/// Subscription to one application's live entries
///
/// A forwarding task decodes topic messages, applies the filter and feeds
/// the bounded delivery queue. The consumer drains it with `recv` (or the
/// channel from `entries`) until the listener is closed.
pub struct LiveListener {
    app_name: String,
    filter: LogFilter,
    rx: Receiver<LogEntry>,
    /// Taken on close; dropping it also stops the forwarding task
    stop_tx: Option<oneshot::Sender<StopReply>>,
}

impl LiveListener {
    /// Subscribe with the default delivery capacity
    pub async fn subscribe<P: PubSub>(
        pubsub: &P,
        app_name: &str,
        filter: LogFilter,
    ) -> Result<Self, LiveError> {
        Self::with_capacity(pubsub, app_name, filter, DEFAULT_DELIVERY_CAPACITY).await
    }

    #[instrument(name = "live_listener_subscribe", skip(pubsub, filter))]
    pub async fn with_capacity<P: PubSub>(
        pubsub: &P,
        app_name: &str,
        filter: LogFilter,
        capacity: usize,
    ) -> Result<Self, LiveError> {
        let subscription = pubsub
            .subscribe(&log_topic(app_name))
            .await
            .map_err(LiveError::Subscribe)?;

        let (tx, rx) = bounded(capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(forward(
            app_name.to_string(),
            subscription,
            filter.clone(),
            tx,
            stop_rx,
        ));

        observability::record_listener_opened(app_name);
        debug!(app = %app_name, ?filter, "Live listener subscribed");

        Ok(Self {
            app_name: app_name.to_string(),
            filter,
            rx,
            stop_tx: Some(stop_tx),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    /// Next matching entry; `None` once the listener is closed and drained
    pub async fn recv(&self) -> Option<LogEntry> {
        self.rx.recv().await.ok()
    }

    /// Delivery queue, for consumers that want a `Stream`
    pub fn entries(&self) -> Receiver<LogEntry> {
        self.rx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.stop_tx.is_none()
    }

    /// Stop delivery and unsubscribe from the topic
    ///
    /// A second call returns `LiveError::AlreadyClosed`.
    pub async fn close(&mut self) -> Result<(), LiveError> {
        let Some(stop_tx) = self.stop_tx.take() else {
            return Err(LiveError::AlreadyClosed {
                app_name: self.app_name.clone(),
            });
        };

        self.rx.close();
        observability::record_listener_closed();

        let (reply_tx, reply_rx) = oneshot::channel();
        if stop_tx.send(reply_tx).is_err() {
            warn!(app = %self.app_name, "Forwarding task already gone");
            return Ok(());
        }
        match reply_rx.await {
            Ok(result) => result.map_err(LiveError::Unsubscribe),
            Err(_) => Ok(()),
        }
    }
}

impl Drop for LiveListener {
    fn drop(&mut self) {
        if self.stop_tx.take().is_some() {
            self.rx.close();
            observability::record_listener_closed();
        }
    }
}

#[instrument(name = "live_listener_forward", skip_all, fields(app = %app_name))]
async fn forward<T: TopicSubscription>(
    app_name: String,
    mut subscription: T,
    filter: LogFilter,
    tx: Sender<LogEntry>,
    mut stop_rx: oneshot::Receiver<StopReply>,
) {
    let reply = loop {
        tokio::select! {
            biased;

            request = &mut stop_rx => break request.ok(),
            message = subscription.next_message() => {
                let Some(payload) = message else {
                    debug!("Topic closed");
                    tx.close();
                    break (&mut stop_rx).await.ok();
                };
                let entry = match LogEntry::decode(&payload) {
                    Ok(entry) => entry,
                    Err(e) => {
                        error!(error = %e, "Failed to decode log entry, skipping");
                        continue;
                    }
                };
                if !filter.matches(&entry) {
                    continue;
                }
                // Fails only once the consumer closed the listener
                if tx.send(entry).await.is_err() {
                    debug!("Delivery queue closed, entry discarded");
                }
            }
        }
    };

    let result = subscription.unsubscribe().await;
    match reply {
        Some(reply) => {
            let _ = reply.send(result);
        }
        // Listener dropped without close
        None => {
            if let Err(e) = result {
                warn!(error = %e, "Unsubscribe failed");
            }
        }
    }
    debug!("Live listener stopped");
}
