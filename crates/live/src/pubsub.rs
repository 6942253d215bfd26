//! MemoryPubSub - in-process topic broker on tokio broadcast channels

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::{ContractError, PubSub, TopicSubscription};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Messages buffered per topic before slow subscribers start lagging
pub const DEFAULT_TOPIC_CAPACITY: usize = 1024;

type Topics = HashMap<String, broadcast::Sender<Bytes>>;

/// Best-effort broker: publishing to a topic nobody listens to succeeds
/// and the message is discarded.
#[derive(Clone)]
pub struct MemoryPubSub {
    topics: Arc<Mutex<Topics>>,
    capacity: usize,
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl MemoryPubSub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of active subscriptions on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock()
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Topics> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PubSub for MemoryPubSub {
    type Subscription = MemorySubscription;

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), ContractError> {
        let mut topics = self.lock();
        let Some(sender) = topics.get(topic) else {
            trace!(topic, "No subscribers, message discarded");
            return Ok(());
        };

        if sender.send(payload).is_err() {
            // Every subscriber is gone
            topics.remove(topic);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<MemorySubscription, ContractError> {
        let receiver = self
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        Ok(MemorySubscription {
            topic: topic.to_string(),
            receiver: Some(receiver),
        })
    }
}

pub struct MemorySubscription {
    topic: String,
    /// `None` after unsubscribe
    receiver: Option<broadcast::Receiver<Bytes>>,
}

impl TopicSubscription for MemorySubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn next_message(&mut self) -> Option<Bytes> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagging, messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), ContractError> {
        match self.receiver.take() {
            Some(_) => Ok(()),
            None => Err(ContractError::subscription(&self.topic, "not subscribed")),
        }
    }
}
